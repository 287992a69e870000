//! Admin API handlers.
//!
//! These endpoints are called by the back office and require the
//! `Coursepay-Admin-Authorization` header with the plaintext admin secret.
//!
//! # Endpoints
//!
//! - `GET    /orders`                                 – list payment orders (paginated, filterable)
//! - `GET    /enrollments`                            – list enrollments (filterable)
//! - `DELETE /enrollments/{user_id}/{course_id}`      – revoke course access

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use coursepay_core::entities::enrollment::Enrollment;
use coursepay_core::entities::payment_order::PaymentOrder;
use coursepay_core::store::StoreError;
use coursepay_sdk::objects::ErrorBody;
use coursepay_sdk::objects::admin::{AdminEnrollmentResponse, AdminOrderResponse};

use crate::state::AppState;

mod delete_enrollment;
mod list_enrollments;
mod list_orders;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders::list_orders))
        .route("/enrollments", get(list_enrollments::list_enrollments))
        .route(
            "/enrollments/{user_id}/{course_id}",
            delete(delete_enrollment::delete_enrollment),
        )
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    Store(StoreError),
    NotFound,
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AdminApiError::Store(e) => {
                tracing::error!(error = %e, "Admin API store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
            AdminApiError::NotFound => (StatusCode::NOT_FOUND, "resource not found"),
        };
        (
            status,
            Json(ErrorBody {
                error: message.to_owned(),
            }),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Clamp admin pagination into `1..=200` rows and a non-negative offset.
pub(crate) fn clamp_pagination(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

pub(crate) fn order_to_admin_response(r: &PaymentOrder) -> AdminOrderResponse {
    AdminOrderResponse {
        id: r.id,
        shop_order_id: r.shop_order_id.clone(),
        user_id: r.user_id,
        course_id: r.course_id,
        course_title: r.course_title.clone(),
        amount: r.amount,
        currency_code: r.currency_code.clone(),
        status: r.status.into(),
        status_description: r.status_description.clone(),
        external_order_id: r.external_order_id.clone(),
        external_payment_id: r.external_payment_id.clone(),
        created_at: r.created_at.unix_timestamp(),
        updated_at: r.updated_at.unix_timestamp(),
    }
}

pub(crate) fn enrollment_to_admin_response(e: &Enrollment) -> AdminEnrollmentResponse {
    AdminEnrollmentResponse {
        user_id: e.user_id,
        course_id: e.course_id,
        payment_status: e.payment_status.into(),
        price_paid: e.price_paid,
        payment_order_id: e.payment_order_id,
        external_order_id: e.external_order_id.clone(),
        paid_at: e.paid_at.map(|t| t.unix_timestamp()),
        updated_at: e.updated_at.unix_timestamp(),
    }
}
