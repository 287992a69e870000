use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for `POST /api/v1/payments/verify`.
///
/// At least one of the identifiers must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    /// External (gateway-assigned) order id.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Internal payment order id.
    #[serde(default)]
    pub payment_order_id: Option<Uuid>,
}

/// Business-level verification outcome.
///
/// The endpoint answers `200 OK` for every variant; only infrastructure
/// failures use other status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Success,
    Pending,
    Failed,
    NotFound,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub status: VerificationStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseSummary>,
}
