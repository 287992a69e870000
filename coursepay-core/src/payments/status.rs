//! Vendor status vocabularies mapped onto order statuses.

use crate::entities::PaymentOrderStatus;
use crate::gateway::PaymentDetails;

/// Map a callback status string.
///
/// Case-insensitive. [`PaymentOrderStatus::Pending`] means "still in
/// flight"; the caller keeps whatever non-terminal status the order has.
/// Unknown strings fail closed.
pub fn map_callback_status(raw: &str) -> PaymentOrderStatus {
    match raw.trim().to_ascii_uppercase().as_str() {
        "COMPLETED" | "APPROVED" | "CAPTURED" | "SUCCESS" | "SUCCEEDED" | "PAID" => {
            PaymentOrderStatus::Success
        }
        "PENDING" | "IN_PROGRESS" | "CREATED" | "PROCESSING" => PaymentOrderStatus::Pending,
        "DECLINED" | "FAILED" | "REJECTED" => PaymentOrderStatus::Failed,
        "CANCELLED" | "CANCELED" | "REVERSED" => PaymentOrderStatus::Cancelled,
        _ => PaymentOrderStatus::Failed,
    }
}

/// Gateway success code used by the payment details endpoint.
pub const SUCCESS_CODE: &str = "100";

/// What a payment-details answer says about the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayVerdict {
    Settled,
    Rejected,
    Undecided,
}

/// Classify a payment-details answer. Unlike callbacks, unknown statuses
/// stay undecided here: polling can always ask again.
pub fn classify_details(details: &PaymentDetails) -> GatewayVerdict {
    let status = details.status.trim().to_ascii_lowercase();
    let code_settled = details.code.as_deref().map(str::trim) == Some(SUCCESS_CODE);
    match status.as_str() {
        "completed" | "success" | "succeeded" | "approved" | "captured" | "paid" => {
            GatewayVerdict::Settled
        }
        _ if code_settled => GatewayVerdict::Settled,
        "rejected" | "failed" | "declined" | "cancelled" | "canceled" => GatewayVerdict::Rejected,
        _ => GatewayVerdict::Undecided,
    }
}
