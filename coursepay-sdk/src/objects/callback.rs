//! Gateway callback payloads.
//!
//! Two vendors post differently shaped bodies to the callback endpoint.
//! Both are normalized into [`CallbackNotice`] before anything touches the
//! order state machine.

use serde::{Deserialize, Serialize};

/// iPay/BOG-style callback body (snake_case fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpayCallback {
    pub status: String,
    #[serde(default)]
    pub shop_order_id: Option<String>,
    #[serde(default)]
    pub payment_hash: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default, alias = "ipay_payment_id")]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub status_description: Option<String>,
}

/// TBC-style callback body (PascalCase fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TbcCallback {
    pub payment_id: String,
    pub status: String,
    /// Carries our shop order id when the payment was created with one.
    #[serde(default)]
    pub merchant_payment_id: Option<String>,
    #[serde(default)]
    pub result_code: Option<String>,
}

/// Any accepted vendor callback body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VendorCallback {
    Tbc(TbcCallback),
    Ipay(IpayCallback),
}

/// Vendor-agnostic callback notice consumed by the reconciliation core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackNotice {
    pub shop_order_id: Option<String>,
    /// Raw vendor status string; mapping happens in the core.
    pub status: String,
    pub payment_hash: Option<String>,
    pub external_order_id: Option<String>,
    pub external_payment_id: Option<String>,
    pub status_description: Option<String>,
}

impl From<IpayCallback> for CallbackNotice {
    fn from(value: IpayCallback) -> Self {
        Self {
            shop_order_id: non_blank(value.shop_order_id),
            status: value.status,
            payment_hash: non_blank(value.payment_hash),
            external_order_id: non_blank(value.order_id),
            external_payment_id: non_blank(value.payment_id),
            status_description: non_blank(value.status_description),
        }
    }
}

impl From<TbcCallback> for CallbackNotice {
    fn from(value: TbcCallback) -> Self {
        Self {
            shop_order_id: non_blank(value.merchant_payment_id),
            status: value.status,
            payment_hash: None,
            external_order_id: None,
            external_payment_id: non_blank(Some(value.payment_id)),
            status_description: value.result_code.map(|code| format!("result code {code}")),
        }
    }
}

impl From<VendorCallback> for CallbackNotice {
    fn from(value: VendorCallback) -> Self {
        match value {
            VendorCallback::Tbc(tbc) => tbc.into(),
            VendorCallback::Ipay(ipay) => ipay.into(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Acknowledgement returned to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAck {
    pub received: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipay_payload_normalizes() {
        let body = r#"{
            "status": "COMPLETED",
            "shop_order_id": "crs-abc-123",
            "payment_hash": "h1",
            "order_id": "ext-1",
            "ipay_payment_id": "pay-1",
            "card_type": "VISA"
        }"#;
        let parsed: VendorCallback = serde_json::from_str(body).unwrap();
        assert!(matches!(parsed, VendorCallback::Ipay(_)));

        let notice = CallbackNotice::from(parsed);
        assert_eq!(notice.shop_order_id.as_deref(), Some("crs-abc-123"));
        assert_eq!(notice.status, "COMPLETED");
        assert_eq!(notice.payment_hash.as_deref(), Some("h1"));
        assert_eq!(notice.external_order_id.as_deref(), Some("ext-1"));
        assert_eq!(notice.external_payment_id.as_deref(), Some("pay-1"));
    }

    #[test]
    fn test_tbc_payload_normalizes() {
        let body = r#"{"PaymentId": "tbc-9", "Status": "Succeeded", "MerchantPaymentId": "crs-x-1"}"#;
        let parsed: VendorCallback = serde_json::from_str(body).unwrap();
        assert!(matches!(parsed, VendorCallback::Tbc(_)));

        let notice = CallbackNotice::from(parsed);
        assert_eq!(notice.shop_order_id.as_deref(), Some("crs-x-1"));
        assert_eq!(notice.status, "Succeeded");
        assert_eq!(notice.external_payment_id.as_deref(), Some("tbc-9"));
        assert!(notice.payment_hash.is_none());
    }

    #[test]
    fn test_blank_shop_order_id_is_absent() {
        let body = r#"{"status": "COMPLETED", "shop_order_id": "  "}"#;
        let notice = CallbackNotice::from(serde_json::from_str::<VendorCallback>(body).unwrap());
        assert!(notice.shop_order_id.is_none());
    }

    #[test]
    fn test_payload_without_status_is_rejected() {
        let body = r#"{"shop_order_id": "crs-abc-123"}"#;
        assert!(serde_json::from_str::<VendorCallback>(body).is_err());
    }
}
