//! Admin API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EnrollmentStatus, OrderStatus};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Full payment order detail for the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOrderResponse {
    pub id: Uuid,
    pub shop_order_id: String,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub amount: rust_decimal::Decimal,
    pub currency_code: String,
    pub status: OrderStatus,
    pub status_description: Option<String>,
    pub external_order_id: Option<String>,
    pub external_payment_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Enrollment record for the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminEnrollmentResponse {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub payment_status: EnrollmentStatus,
    pub price_paid: Option<rust_decimal::Decimal>,
    pub payment_order_id: Option<Uuid>,
    pub external_order_id: Option<String>,
    pub paid_at: Option<i64>,
    pub updated_at: i64,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Query parameters for `GET /orders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Query parameters for `GET /enrollments`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListEnrollmentsQuery {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub course_id: Option<Uuid>,
}
