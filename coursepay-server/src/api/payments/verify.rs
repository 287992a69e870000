use axum::{
    Json,
    extract::State,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use coursepay_core::payments::PaymentError;
use coursepay_sdk::objects::{VerificationStatus, VerifyPaymentRequest, VerifyPaymentResponse};

use crate::api::ApiError;
use crate::api::extractors::MaybeCaller;
use crate::state::AppState;

/// `POST /verify` – reconcile the caller's order and report the outcome.
///
/// Every business outcome is `200`. Infrastructure failures keep the
/// verification body shape with status `error`.
pub async fn verify(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    body: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let caller = caller.ok_or(ApiError(PaymentError::Unauthorized))?;
    let Json(request) = body?;

    match state.payments.verify(Some(&caller), request).await {
        Ok(response) => Ok(Json(response).into_response()),
        Err(e @ (PaymentError::Unauthorized | PaymentError::BadRequest(_))) => Err(ApiError(e)),
        Err(e) => {
            tracing::error!(error = %e, "Payment verification failed");
            let body = VerifyPaymentResponse {
                status: VerificationStatus::Error,
                message: "payment verification failed".to_owned(),
                course: None,
            };
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
        }
    }
}
