//! In-memory application for router tests.

use crate::config::runtime::{
    AdminConfig, AuthConfig, CallbackConfig, CheckoutConfig, GatewayConfig, ServerConfig,
    SharedConfig, StaticToken, SweeperConfig,
};
use crate::server::build_router;
use crate::state::AppState;
use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use coursepay_core::entities::PaymentIntent;
use coursepay_core::entities::course::Course;
use coursepay_core::gateway::{
    APPROVE_REL, CreateExternalOrder, ExternalOrder, GatewayError, GatewayLink, PaymentDetails,
    PaymentGateway, Receipt,
};
use coursepay_core::identity::{Caller, IdentityError, IdentityProvider, StaticIdentity};
use coursepay_core::payments::PaymentService;
use coursepay_core::store::MemoryStore;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const USER_TOKEN: &str = "user-token";
pub const OTHER_USER_TOKEN: &str = "other-user-token";
pub const ADMIN_SECRET: &str = "back-office";

/// Approves every order; payment details come from what was settled.
#[derive(Default)]
pub struct StubGateway {
    details: Mutex<HashMap<String, PaymentDetails>>,
}

impl StubGateway {
    /// Report the order as paid in full on the next details lookup.
    pub fn settle(&self, shop_order_id: &str, amount: Decimal) {
        self.details.lock().unwrap().insert(
            format!("ext-{shop_order_id}"),
            PaymentDetails {
                status: "success".to_owned(),
                code: Some("100".to_owned()),
                payment_id: Some(format!("pay-{shop_order_id}")),
                receipt: Receipt {
                    shop_order_id: Some(shop_order_id.to_owned()),
                    amount: Some(amount),
                    currency_code: Some("GEL".to_owned()),
                },
            },
        );
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_order(&self, order: CreateExternalOrder) -> Result<ExternalOrder, GatewayError> {
        Ok(ExternalOrder {
            order_id: format!("ext-{}", order.shop_order_id),
            status: "CREATED".to_owned(),
            payment_hash: Some(format!("hash-{}", order.shop_order_id)),
            links: vec![GatewayLink {
                href: format!("https://gateway.test/pay/{}", order.shop_order_id),
                rel: APPROVE_REL.to_owned(),
                method: Some("REDIRECT".to_owned()),
            }],
        })
    }

    async fn payment_details(
        &self,
        external_order_id: &str,
    ) -> Result<PaymentDetails, GatewayError> {
        self.details
            .lock()
            .unwrap()
            .get(external_order_id)
            .cloned()
            .ok_or(GatewayError::Status {
                status: 503,
                body: "unavailable".to_owned(),
            })
    }
}

/// An identity provider that is always down.
pub struct BrokenIdentity;

#[async_trait]
impl IdentityProvider for BrokenIdentity {
    async fn resolve(&self, _bearer: &str) -> Result<Option<Caller>, IdentityError> {
        Err(IdentityError::Status(500))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<StubGateway>,
    pub course: Course,
    pub user_id: Uuid,
    pub other_user_id: Uuid,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_callback_token(None).await
    }

    pub async fn with_callback_token(token: Option<&str>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(StubGateway::default());
        let course = Course {
            id: Uuid::new_v4(),
            title: "Rust for Payments".to_owned(),
            price: Some(Decimal::new(500, 0)),
        };
        store.put_course(course.clone()).await;

        let user_id = Uuid::new_v4();
        let other_user_id = Uuid::new_v4();
        let tokens = vec![
            StaticToken {
                token: USER_TOKEN.to_owned(),
                user_id,
            },
            StaticToken {
                token: OTHER_USER_TOKEN.to_owned(),
                user_id: other_user_id,
            },
        ];

        let checkout = CheckoutConfig {
            currency: "GEL".to_owned(),
            locale: "ka".to_owned(),
            intent: PaymentIntent::Capture,
            success_url: "https://courses.test/payment/success".to_owned(),
            fail_url: "https://courses.test/payment/fail".to_owned(),
            callback_url: None,
        };
        let payments = PaymentService::with_store(store.clone(), gateway.clone(), checkout.clone());
        let config = shared_config(checkout, tokens.clone(), token.map(str::to_owned));
        let state = AppState::new(payments, Arc::new(StaticIdentity::new(tokens)), config);

        Self {
            router: build_router(state.clone()),
            state,
            store,
            gateway,
            course,
            user_id,
            other_user_id,
        }
    }

    /// Same application, with a different identity provider.
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.state.identity = identity;
        self.router = build_router(self.state.clone());
        self
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }
}

fn shared_config(
    checkout: CheckoutConfig,
    tokens: Vec<StaticToken>,
    callback_token: Option<String>,
) -> SharedConfig {
    let salt = SaltString::generate(&mut OsRng);
    let secret_hash = Argon2::default()
        .hash_password(ADMIN_SECRET.as_bytes(), &salt)
        .unwrap()
        .to_string();

    SharedConfig {
        server: Arc::new(RwLock::new(ServerConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
        })),
        admin: Arc::new(RwLock::new(AdminConfig::new(secret_hash))),
        callback: Arc::new(RwLock::new(CallbackConfig {
            token: callback_token,
        })),
        gateway: Arc::new(RwLock::new(GatewayConfig {
            base_url: "https://gateway.test/api".parse().unwrap(),
            client_id: "test".to_owned(),
            client_secret: "test".to_owned(),
            token_margin: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
        })),
        checkout: Arc::new(RwLock::new(checkout)),
        auth: Arc::new(RwLock::new(AuthConfig::Static(tokens))),
        sweeper: Arc::new(RwLock::new(SweeperConfig::default())),
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn admin_request(method: &str, uri: &str, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(secret) = secret {
        builder = builder.header(coursepay_sdk::ADMIN_AUTH_HEADER, secret);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
