pub mod course;
pub mod enrollment;
pub mod payment_order;

use coursepay_sdk::objects::{
    EnrollmentStatus as SdkEnrollmentStatus, OrderStatus as SdkOrderStatus,
};

/// Payment order status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `coursepay_sdk::objects::OrderStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "payment_order_status")]
pub enum PaymentOrderStatus {
    Pending,
    Redirected,
    Success,
    Failed,
    Cancelled,
}

impl PaymentOrderStatus {
    /// Terminal statuses are absorbing: no later write may change them.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PaymentOrderStatus::Success | PaymentOrderStatus::Failed | PaymentOrderStatus::Cancelled
        )
    }
}

impl std::fmt::Display for PaymentOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkOrderStatus::from(*self).fmt(f)
    }
}

impl From<PaymentOrderStatus> for SdkOrderStatus {
    fn from(value: PaymentOrderStatus) -> Self {
        match value {
            PaymentOrderStatus::Pending => SdkOrderStatus::Pending,
            PaymentOrderStatus::Redirected => SdkOrderStatus::Redirected,
            PaymentOrderStatus::Success => SdkOrderStatus::Success,
            PaymentOrderStatus::Failed => SdkOrderStatus::Failed,
            PaymentOrderStatus::Cancelled => SdkOrderStatus::Cancelled,
        }
    }
}

impl From<SdkOrderStatus> for PaymentOrderStatus {
    fn from(value: SdkOrderStatus) -> Self {
        match value {
            SdkOrderStatus::Pending => PaymentOrderStatus::Pending,
            SdkOrderStatus::Redirected => PaymentOrderStatus::Redirected,
            SdkOrderStatus::Success => PaymentOrderStatus::Success,
            SdkOrderStatus::Failed => PaymentOrderStatus::Failed,
            SdkOrderStatus::Cancelled => PaymentOrderStatus::Cancelled,
        }
    }
}

/// Enrollment payment status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `coursepay_sdk::objects::EnrollmentStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "enrollment_payment_status")]
pub enum EnrollmentPaymentStatus {
    Pending,
    Paid,
    Failed,
    Test,
    Completed,
}

impl EnrollmentPaymentStatus {
    /// Whether this status is proof of course access.
    pub fn grants_access(self) -> bool {
        matches!(
            self,
            EnrollmentPaymentStatus::Paid | EnrollmentPaymentStatus::Completed
        )
    }
}

impl From<EnrollmentPaymentStatus> for SdkEnrollmentStatus {
    fn from(value: EnrollmentPaymentStatus) -> Self {
        match value {
            EnrollmentPaymentStatus::Pending => SdkEnrollmentStatus::Pending,
            EnrollmentPaymentStatus::Paid => SdkEnrollmentStatus::Paid,
            EnrollmentPaymentStatus::Failed => SdkEnrollmentStatus::Failed,
            EnrollmentPaymentStatus::Test => SdkEnrollmentStatus::Test,
            EnrollmentPaymentStatus::Completed => SdkEnrollmentStatus::Completed,
        }
    }
}

/// Whether the gateway should capture funds immediately or only authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(rename_all = "lowercase", type_name = "payment_intent")]
#[serde(rename_all = "lowercase")]
pub enum PaymentIntent {
    Capture,
    Authorize,
}

impl PaymentIntent {
    /// The gateway's spelling of the intent.
    pub fn as_gateway_str(self) -> &'static str {
        match self {
            PaymentIntent::Capture => "CAPTURE",
            PaymentIntent::Authorize => "AUTHORIZE",
        }
    }
}
