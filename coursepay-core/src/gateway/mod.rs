//! Payment gateway client.
//!
//! [`PaymentGateway`] is the seam the payment service calls; [`IpayGateway`]
//! is the REST implementation with OAuth token caching. The adapter holds no
//! business state.

mod ipay;
mod token;
mod wire;

pub use ipay::IpayGateway;
pub use token::TokenCache;

use crate::entities::PaymentIntent;
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Link relation of the hosted payment page the browser is sent to.
pub const APPROVE_REL: &str = "approve";

/// Errors that can occur while talking to the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure, including timeouts.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-2xx status.
    #[error("gateway returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The gateway answered 2xx with a body we could not use.
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

/// Arguments for creating an order on the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateExternalOrder {
    pub shop_order_id: String,
    pub amount: Decimal,
    pub currency_code: String,
    pub course_id: Uuid,
    pub course_title: String,
    pub locale: String,
    pub intent: PaymentIntent,
    pub success_url: String,
    pub fail_url: String,
    pub callback_url: Option<String>,
    pub payment_method: Option<String>,
    pub installment_months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayLink {
    pub href: String,
    pub rel: String,
    pub method: Option<String>,
}

/// The gateway's view of a freshly created order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalOrder {
    pub order_id: String,
    pub status: String,
    pub payment_hash: Option<String>,
    pub links: Vec<GatewayLink>,
}

impl ExternalOrder {
    /// The hosted payment page, if the gateway produced one.
    pub fn approve_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel.eq_ignore_ascii_case(APPROVE_REL))
            .map(|link| link.href.as_str())
            .filter(|href| !href.is_empty())
    }
}

/// Settlement fields echoed back by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    /// Our shop order id as the gateway recorded it.
    pub shop_order_id: Option<String>,
    pub amount: Option<Decimal>,
    pub currency_code: Option<String>,
}

/// Authoritative current state of an order on the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentDetails {
    pub status: String,
    pub code: Option<String>,
    pub payment_id: Option<String>,
    pub receipt: Receipt,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order on the gateway. Anything but a clean 2xx with a
    /// parseable body is an error.
    async fn create_order(&self, order: CreateExternalOrder) -> Result<ExternalOrder, GatewayError>;

    /// Fetch the authoritative state of a previously created order.
    async fn payment_details(&self, external_order_id: &str)
    -> Result<PaymentDetails, GatewayError>;
}
