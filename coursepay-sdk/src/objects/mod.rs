pub mod admin;
pub mod callback;
pub mod order;
pub mod verify;

pub use callback::{CallbackAck, CallbackNotice, IpayCallback, TbcCallback, VendorCallback};
pub use order::{CreateOrderRequest, CreateOrderResponse};
pub use verify::{CourseSummary, VerificationStatus, VerifyPaymentRequest, VerifyPaymentResponse};

use serde::{Deserialize, Serialize};

/// Payment order status for API responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `coursepay-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Redirected,
    Success,
    Failed,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Redirected => write!(f, "redirected"),
            OrderStatus::Success => write!(f, "success"),
            OrderStatus::Failed => write!(f, "failed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "redirected" => Ok(OrderStatus::Redirected),
            "success" => Ok(OrderStatus::Success),
            "failed" => Ok(OrderStatus::Failed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// Enrollment payment status for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Pending,
    Paid,
    Failed,
    Test,
    Completed,
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentStatus::Pending => write!(f, "pending"),
            EnrollmentStatus::Paid => write!(f, "paid"),
            EnrollmentStatus::Failed => write!(f, "failed"),
            EnrollmentStatus::Test => write!(f, "test"),
            EnrollmentStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

/// JSON error body returned by every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
