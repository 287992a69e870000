//! HTTP API.
//!
//! - `/api/v1/payments` – frontend and gateway facing endpoints
//! - `/api/v1/admin`    – back-office endpoints

pub mod admin;
pub mod extractors;
pub mod payments;

use axum::extract::rejection::JsonRejection;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use coursepay_core::payments::PaymentError;
use coursepay_sdk::objects::ErrorBody;

/// A [`PaymentError`] on its way to the client.
///
/// Internal causes are logged; clients only ever see a short message.
#[derive(Debug)]
pub struct ApiError(pub PaymentError);

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(PaymentError::BadRequest(rejection.body_text()))
    }
}

impl ApiError {
    pub(crate) fn status(&self) -> StatusCode {
        match &self.0 {
            PaymentError::Unauthorized => StatusCode::UNAUTHORIZED,
            PaymentError::BadRequest(_) => StatusCode::BAD_REQUEST,
            PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
            PaymentError::Conflict(_) => StatusCode::CONFLICT,
            PaymentError::Gateway(_) => StatusCode::BAD_GATEWAY,
            PaymentError::InvalidState(_) | PaymentError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub(crate) fn message(&self) -> String {
        match &self.0 {
            PaymentError::Unauthorized => "authentication required".to_owned(),
            PaymentError::BadRequest(msg) => msg.clone(),
            PaymentError::NotFound(what) => format!("{what} not found"),
            PaymentError::Conflict(msg) => msg.clone(),
            PaymentError::Gateway(_) => "payment gateway unavailable".to_owned(),
            PaymentError::InvalidState(_) | PaymentError::Store(_) => {
                "internal server error".to_owned()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            PaymentError::Gateway(e) => tracing::error!(error = %e, "Payment gateway error"),
            PaymentError::Store(e) => tracing::error!(error = %e, "Store error"),
            PaymentError::InvalidState(msg) => tracing::error!(reason = %msg, "Invalid state"),
            _ => {}
        }
        let body = ErrorBody {
            error: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
pub(crate) mod testing;
