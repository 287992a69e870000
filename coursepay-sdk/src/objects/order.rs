use serde::{Deserialize, Serialize};

/// Request body for `POST /api/v1/payments/orders`.
///
/// Sent by the course frontend on behalf of a signed-in user. The price is
/// never part of the request; the server reads it from the course catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Required; kept optional here so a missing field is reported as
    /// `400 Bad Request` instead of a deserialization rejection.
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub installment_months: Option<u32>,
    #[serde(default)]
    pub discount_code: Option<String>,
}

/// Response returned once the gateway accepted the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    /// The gateway's hosted payment page (`approve` link).
    pub redirect_url: String,
    pub shop_order_id: String,
    /// The gateway-assigned order identifier.
    pub order_id: String,
}
