//! JSON shapes of the gateway's REST API.

use super::{CreateExternalOrder, ExternalOrder, GatewayError, GatewayLink, PaymentDetails, Receipt};
use crate::entities::PaymentIntent;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    300
}

#[derive(Debug, Serialize)]
pub(super) struct CreateOrderBody {
    intent: &'static str,
    capture_method: &'static str,
    shop_order_id: String,
    locale: String,
    show_shop_order_id_on_extract: bool,
    redirect_urls: RedirectUrls,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<String>,
    items: Vec<Item>,
    purchase_units: Vec<PurchaseUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_method: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    installment: Option<Installment>,
}

#[derive(Debug, Serialize)]
struct RedirectUrls {
    success: String,
    fail: String,
}

#[derive(Debug, Serialize)]
struct Item {
    product_id: String,
    description: String,
    quantity: String,
    amount: String,
}

#[derive(Debug, Serialize)]
struct PurchaseUnit {
    amount: Amount,
    industry_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Amount {
    currency_code: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct Installment {
    month: u32,
}

impl From<CreateExternalOrder> for CreateOrderBody {
    fn from(order: CreateExternalOrder) -> Self {
        let value = format!("{:.2}", order.amount);
        let capture_method = match order.intent {
            PaymentIntent::Capture => "AUTOMATIC",
            PaymentIntent::Authorize => "MANUAL",
        };
        Self {
            intent: order.intent.as_gateway_str(),
            capture_method,
            shop_order_id: order.shop_order_id,
            locale: order.locale,
            show_shop_order_id_on_extract: true,
            redirect_urls: RedirectUrls {
                success: order.success_url,
                fail: order.fail_url,
            },
            callback_url: order.callback_url,
            items: vec![Item {
                product_id: order.course_id.to_string(),
                description: order.course_title,
                quantity: "1".to_owned(),
                amount: value.clone(),
            }],
            purchase_units: vec![PurchaseUnit {
                amount: Amount {
                    currency_code: order.currency_code,
                    value,
                },
                industry_type: "ECOMMERCE",
            }],
            payment_method: order.payment_method.map(|method| vec![method]),
            installment: order.installment_months.map(|month| Installment { month }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateOrderResponse {
    order_id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    payment_hash: Option<String>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
    #[serde(default)]
    method: Option<String>,
}

impl From<CreateOrderResponse> for ExternalOrder {
    fn from(resp: CreateOrderResponse) -> Self {
        Self {
            order_id: resp.order_id,
            status: resp.status,
            payment_hash: resp.payment_hash.filter(|h| !h.is_empty()),
            links: resp
                .links
                .into_iter()
                .map(|link| GatewayLink {
                    href: link.href,
                    rel: link.rel,
                    method: link.method,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PaymentDetailsResponse {
    status: String,
    #[serde(default, alias = "status_code")]
    code: Option<serde_json::Value>,
    #[serde(default, alias = "ipay_payment_id")]
    payment_id: Option<String>,
    #[serde(default)]
    shop_order_id: Option<String>,
    #[serde(default)]
    purchase_units: Option<SettledUnits>,
}

#[derive(Debug, Deserialize)]
struct SettledUnits {
    #[serde(default)]
    transfer_amount: Option<serde_json::Value>,
    #[serde(default)]
    currency_code: Option<String>,
}

impl TryFrom<PaymentDetailsResponse> for PaymentDetails {
    type Error = GatewayError;

    fn try_from(resp: PaymentDetailsResponse) -> Result<Self, Self::Error> {
        let (amount, currency_code) = match resp.purchase_units {
            Some(units) => (
                units.transfer_amount.as_ref().map(decimal_from_json).transpose()?,
                units.currency_code,
            ),
            None => (None, None),
        };
        Ok(Self {
            status: resp.status,
            code: resp.code.as_ref().and_then(scalar_to_string),
            payment_id: resp.payment_id,
            receipt: Receipt {
                shop_order_id: resp.shop_order_id,
                amount,
                currency_code,
            },
        })
    }
}

/// Amounts arrive as JSON strings or numbers depending on the endpoint.
fn decimal_from_json(value: &serde_json::Value) -> Result<Decimal, GatewayError> {
    let text = scalar_to_string(value)
        .ok_or_else(|| GatewayError::InvalidResponse(format!("amount is not a scalar: {value}")))?;
    Decimal::from_str(&text)
        .map_err(|e| GatewayError::InvalidResponse(format!("invalid amount {text:?}: {e}")))
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_create_body_carries_fixed_amount_and_urls() {
        let body = CreateOrderBody::from(CreateExternalOrder {
            shop_order_id: "crs-abc-1".to_owned(),
            amount: Decimal::new(500, 0),
            currency_code: "GEL".to_owned(),
            course_id: Uuid::nil(),
            course_title: "Course".to_owned(),
            locale: "ka".to_owned(),
            intent: PaymentIntent::Capture,
            success_url: "https://shop.test/ok".to_owned(),
            fail_url: "https://shop.test/fail".to_owned(),
            callback_url: Some("https://api.test/cb".to_owned()),
            payment_method: None,
            installment_months: Some(6),
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["intent"], "CAPTURE");
        assert_eq!(json["purchase_units"][0]["amount"]["value"], "500.00");
        assert_eq!(json["purchase_units"][0]["amount"]["currency_code"], "GEL");
        assert_eq!(json["redirect_urls"]["fail"], "https://shop.test/fail");
        assert_eq!(json["installment"]["month"], 6);
        assert!(json.get("payment_method").is_none());
    }

    #[test]
    fn test_details_accept_numeric_amount_and_code() {
        let resp: PaymentDetailsResponse = serde_json::from_str(
            r#"{
                "status": "completed",
                "status_code": 100,
                "shop_order_id": "crs-abc-1",
                "purchase_units": {"transfer_amount": 500.0, "currency_code": "GEL"}
            }"#,
        )
        .unwrap();
        let details = PaymentDetails::try_from(resp).unwrap();
        assert_eq!(details.code.as_deref(), Some("100"));
        assert_eq!(details.receipt.amount, Some(Decimal::new(500, 0)));
        assert_eq!(details.receipt.currency_code.as_deref(), Some("GEL"));
    }

    #[test]
    fn test_details_reject_garbage_amount() {
        let resp: PaymentDetailsResponse = serde_json::from_str(
            r#"{"status": "completed", "purchase_units": {"transfer_amount": "five hundred"}}"#,
        )
        .unwrap();
        assert!(PaymentDetails::try_from(resp).is_err());
    }
}
