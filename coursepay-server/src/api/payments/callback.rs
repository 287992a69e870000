use axum::{Json, extract::State, extract::rejection::JsonRejection, response::IntoResponse};
use coursepay_sdk::objects::{CallbackNotice, VendorCallback};

use crate::api::ApiError;
use crate::api::extractors::CallbackToken;
use crate::state::AppState;

/// `POST /callback` – accept a vendor-shaped notification.
///
/// Answers `{"received": true}` once the notice has been applied (or was a
/// harmless replay).
pub async fn callback(
    State(state): State<AppState>,
    _token: CallbackToken,
    body: Result<Json<VendorCallback>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = body?;
    let notice = CallbackNotice::from(payload);

    let ack = state.payments.handle_callback(notice).await?;
    Ok(Json(ack))
}
