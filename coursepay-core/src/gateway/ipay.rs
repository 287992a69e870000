use super::wire::{CreateOrderBody, CreateOrderResponse, PaymentDetailsResponse, TokenResponse};
use super::{
    CreateExternalOrder, ExternalOrder, GatewayError, PaymentDetails, PaymentGateway, TokenCache,
};
use crate::config::GatewayConfig;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// REST client for an iPay/BOG-style checkout API.
///
/// Cloning is cheap; clones share the HTTP connection pool and the token
/// cache.
#[derive(Debug, Clone)]
pub struct IpayGateway {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    tokens: Arc<TokenCache>,
}

impl IpayGateway {
    pub fn new(config: &GatewayConfig, tokens: Arc<TokenCache>) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.as_str().trim_end_matches('/').to_owned(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            tokens,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A bearer token for the order API.
    ///
    /// Served from the cache unless it expired or `force_refresh` is set.
    /// Concurrent refreshes are not coalesced; the last one wins the cache.
    pub async fn access_token(&self, force_refresh: bool) -> Result<String, GatewayError> {
        if !force_refresh && let Some(token) = self.tokens.get().await {
            return Ok(token);
        }

        debug!("Requesting gateway access token");
        let response = self
            .http
            .post(self.endpoint("/oauth2/token"))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body("grant_type=client_credentials")
            .send()
            .await?;
        let token: TokenResponse = parse_json(response).await?;
        if token.access_token.is_empty() {
            return Err(GatewayError::InvalidResponse(
                "token endpoint returned an empty access_token".to_owned(),
            ));
        }

        self.tokens
            .store(
                token.access_token.clone(),
                Duration::from_secs(token.expires_in),
            )
            .await;
        Ok(token.access_token)
    }

    /// Send an authorized request, refreshing the token once on `401`.
    async fn send_authorized<F>(&self, build: F) -> Result<Response, GatewayError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let token = self.access_token(false).await?;
        let response = build(&self.http).bearer_auth(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("Gateway rejected cached token, refreshing");
        self.tokens.invalidate().await;
        let token = self.access_token(true).await?;
        Ok(build(&self.http).bearer_auth(&token).send().await?)
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl PaymentGateway for IpayGateway {
    #[tracing::instrument(skip_all, err, fields(shop_order_id = %order.shop_order_id))]
    async fn create_order(&self, order: CreateExternalOrder) -> Result<ExternalOrder, GatewayError> {
        let body = CreateOrderBody::from(order);
        let url = self.endpoint("/checkout/orders");
        let response = self
            .send_authorized(|http| http.post(&url).json(&body))
            .await?;
        let created: CreateOrderResponse = parse_json(response).await?;
        Ok(created.into())
    }

    #[tracing::instrument(skip(self), err)]
    async fn payment_details(
        &self,
        external_order_id: &str,
    ) -> Result<PaymentDetails, GatewayError> {
        let url = self.endpoint(&format!(
            "/checkout/payment/{}",
            urlencoding::encode(external_order_id)
        ));
        let response = self.send_authorized(|http| http.get(&url)).await?;
        let details: PaymentDetailsResponse = parse_json(response).await?;
        details.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PaymentIntent;
    use axum::extract::{Path, State};
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    #[derive(Default)]
    struct StubCounters {
        token_calls: AtomicUsize,
        order_calls: AtomicUsize,
        reject_first_order: bool,
        fail_orders: bool,
    }

    async fn token(State(counters): State<Arc<StubCounters>>) -> Json<Value> {
        let n = counters.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Json(json!({
            "access_token": format!("token-{n}"),
            "token_type": "Bearer",
            "expires_in": 300
        }))
    }

    async fn orders(
        State(counters): State<Arc<StubCounters>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let n = counters.order_calls.fetch_add(1, Ordering::SeqCst);
        if counters.fail_orders {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "upstream down"})),
            );
        }
        if counters.reject_first_order && n == 0 {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "expired"})));
        }
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        (
            StatusCode::OK,
            Json(json!({
                "status": "CREATED",
                "order_id": "ext-1",
                "payment_hash": "hash-1",
                "links": [
                    {"href": "https://gateway.test/checkout/ext-1", "rel": "approve", "method": "REDIRECT"},
                    {"href": "https://gateway.test/api/ext-1", "rel": "self", "method": "GET"}
                ],
                "echo_amount": body["purchase_units"][0]["amount"]["value"],
                "echo_auth": auth
            })),
        )
    }

    async fn details(Path(order_id): Path<String>) -> Json<Value> {
        Json(json!({
            "status": "success",
            "payment_id": format!("pay-{order_id}"),
            "shop_order_id": "crs-abc-1",
            "purchase_units": {"transfer_amount": "500.00", "currency_code": "GEL"}
        }))
    }

    async fn spawn_stub(counters: Arc<StubCounters>) -> GatewayConfig {
        let app = Router::new()
            .route("/api/oauth2/token", post(token))
            .route("/api/checkout/orders", post(orders))
            .route("/api/checkout/payment/{order_id}", get(details))
            .with_state(counters);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        GatewayConfig {
            base_url: format!("http://{addr}/api/").parse().unwrap(),
            client_id: "client".to_owned(),
            client_secret: "secret".to_owned(),
            token_margin: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
        }
    }

    fn new_order() -> CreateExternalOrder {
        CreateExternalOrder {
            shop_order_id: "crs-abc-1".to_owned(),
            amount: Decimal::new(500, 0),
            currency_code: "GEL".to_owned(),
            course_id: Uuid::new_v4(),
            course_title: "Rust for Payments".to_owned(),
            locale: "ka".to_owned(),
            intent: PaymentIntent::Capture,
            success_url: "https://shop.test/ok".to_owned(),
            fail_url: "https://shop.test/fail".to_owned(),
            callback_url: None,
            payment_method: None,
            installment_months: None,
        }
    }

    #[tokio::test]
    async fn test_token_is_cached_across_calls() {
        let counters = Arc::new(StubCounters::default());
        let config = spawn_stub(counters.clone()).await;
        let gateway = IpayGateway::new(&config, Arc::new(TokenCache::new(config.token_margin)))
            .unwrap();

        let first = gateway.access_token(false).await.unwrap();
        let second = gateway.access_token(false).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(counters.token_calls.load(Ordering::SeqCst), 1);

        let forced = gateway.access_token(true).await.unwrap();
        assert_ne!(forced, first);
        assert_eq!(counters.token_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_create_order_returns_approve_link() {
        let counters = Arc::new(StubCounters::default());
        let config = spawn_stub(counters.clone()).await;
        let gateway = IpayGateway::new(&config, Arc::new(TokenCache::new(config.token_margin)))
            .unwrap();

        let created = gateway.create_order(new_order()).await.unwrap();
        assert_eq!(created.order_id, "ext-1");
        assert_eq!(created.payment_hash.as_deref(), Some("hash-1"));
        assert_eq!(
            created.approve_link(),
            Some("https://gateway.test/checkout/ext-1")
        );
    }

    #[tokio::test]
    async fn test_unauthorized_triggers_single_refresh() {
        let counters = Arc::new(StubCounters {
            reject_first_order: true,
            ..Default::default()
        });
        let config = spawn_stub(counters.clone()).await;
        let gateway = IpayGateway::new(&config, Arc::new(TokenCache::new(config.token_margin)))
            .unwrap();

        gateway.create_order(new_order()).await.unwrap();
        assert_eq!(counters.token_calls.load(Ordering::SeqCst), 2);
        assert_eq!(counters.order_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let counters = Arc::new(StubCounters {
            fail_orders: true,
            ..Default::default()
        });
        let config = spawn_stub(counters).await;
        let gateway = IpayGateway::new(&config, Arc::new(TokenCache::new(config.token_margin)))
            .unwrap();

        let err = gateway.create_order(new_order()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_payment_details_parses_receipt() {
        let counters = Arc::new(StubCounters::default());
        let config = spawn_stub(counters).await;
        let gateway = IpayGateway::new(&config, Arc::new(TokenCache::new(config.token_margin)))
            .unwrap();

        let details = gateway.payment_details("ext-1").await.unwrap();
        assert_eq!(details.status, "success");
        assert_eq!(details.payment_id.as_deref(), Some("pay-ext-1"));
        assert_eq!(details.receipt.shop_order_id.as_deref(), Some("crs-abc-1"));
        assert_eq!(details.receipt.amount, Some(Decimal::new(50000, 2)));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_http_error() {
        let config = GatewayConfig {
            base_url: "http://127.0.0.1:9/".parse().unwrap(),
            client_id: "client".to_owned(),
            client_secret: "secret".to_owned(),
            token_margin: Duration::from_secs(30),
            timeout: Duration::from_secs(2),
        };
        let gateway = IpayGateway::new(&config, Arc::new(TokenCache::new(config.token_margin)))
            .unwrap();
        let err = gateway.payment_details("ext-1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Http(_)));
    }
}
