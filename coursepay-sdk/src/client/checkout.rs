//! Checkout client (course frontend → coursepay server).
//!
//! Every request carries the signed-in user's bearer token from the hosted
//! auth platform.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::order::{CreateOrderRequest, CreateOrderResponse};
use crate::objects::verify::{VerifyPaymentRequest, VerifyPaymentResponse};

/// Typed HTTP client for the payment endpoints used by the course frontend.
#[derive(Debug, Clone)]
pub struct CheckoutClient {
    http: Client,
    base_url: Url,
    access_token: String,
}

impl CheckoutClient {
    /// Create a new `CheckoutClient`.
    ///
    /// * `base_url` – root URL of the coursepay server.
    /// * `access_token` – the user's bearer token.
    pub fn new(base_url: Url, access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            access_token: access_token.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/payments/orders` – start a purchase and obtain the
    /// gateway redirect URL.
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ClientError> {
        let url = self.base_url.join("/api/v1/payments/orders")?;

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `POST /api/v1/payments/verify` – ask the server to confirm a payment
    /// after the user returns from the gateway's hosted page.
    pub async fn verify_payment(
        &self,
        request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, ClientError> {
        let url = self.base_url.join("/api/v1/payments/verify")?;

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await?;

        parse_response(resp).await
    }
}
