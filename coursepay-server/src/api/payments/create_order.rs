use axum::{Json, extract::State, extract::rejection::JsonRejection, response::IntoResponse};
use coursepay_core::payments::PaymentError;
use coursepay_sdk::objects::CreateOrderRequest;

use crate::api::ApiError;
use crate::api::extractors::MaybeCaller;
use crate::state::AppState;

/// `POST /orders` – create an order and hand back the gateway's hosted
/// payment page.
pub async fn create_order(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // Identity is checked before the body is looked at.
    let caller = caller.ok_or(ApiError(PaymentError::Unauthorized))?;
    let Json(request) = body?;

    let response = state.payments.create_order(Some(&caller), request).await?;
    Ok(Json(response))
}
