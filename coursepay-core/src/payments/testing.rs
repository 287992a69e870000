//! Test doubles shared by the payment and processor tests.

use super::PaymentService;
use crate::config::CheckoutConfig;
use crate::entities::PaymentIntent;
use crate::entities::course::Course;
use crate::gateway::{
    APPROVE_REL, CreateExternalOrder, ExternalOrder, GatewayError, GatewayLink, PaymentDetails,
    PaymentGateway, Receipt,
};
use crate::entities::payment_order::{
    ListPaymentOrders, ListStaleRedirectedOrders, MarkOrderChecked, OrderLookup, OrderRedirect,
    OrderStatusUpdate, PaymentOrder, PaymentOrderInsert,
};
use crate::entities::PaymentOrderStatus;
use crate::identity::Caller;
use crate::store::{MemoryStore, OrderStore, StoreError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateBehavior {
    Approve,
    /// Approve, but hand out no payment hash.
    ApproveUnhashed,
    MissingApproveLink,
    Fail,
}

/// Scriptable gateway.
///
/// Created orders get `ext-{shop_order_id}` and `hash-{shop_order_id}`.
/// Payment details answer whatever was scripted for the external id, or
/// `503` when nothing was.
pub struct FakeGateway {
    create_behavior: Mutex<CreateBehavior>,
    details: Mutex<HashMap<String, PaymentDetails>>,
    pub create_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            create_behavior: Mutex::new(CreateBehavior::Approve),
            details: Mutex::new(HashMap::new()),
            create_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeGateway {
    pub fn set_create_behavior(&self, behavior: CreateBehavior) {
        *self.create_behavior.lock().unwrap() = behavior;
    }

    pub fn script_details(&self, external_order_id: &str, details: PaymentDetails) {
        self.details
            .lock()
            .unwrap()
            .insert(external_order_id.to_owned(), details);
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, order: CreateExternalOrder) -> Result<ExternalOrder, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.create_behavior.lock().unwrap();
        let mut links = vec![GatewayLink {
            href: format!("https://gateway.test/api/{}", order.shop_order_id),
            rel: "self".to_owned(),
            method: Some("GET".to_owned()),
        }];
        match behavior {
            CreateBehavior::Fail => {
                return Err(GatewayError::Status {
                    status: 500,
                    body: "internal error".to_owned(),
                });
            }
            CreateBehavior::MissingApproveLink => {}
            CreateBehavior::Approve | CreateBehavior::ApproveUnhashed => links.push(GatewayLink {
                href: format!("https://gateway.test/pay/{}", order.shop_order_id),
                rel: APPROVE_REL.to_owned(),
                method: Some("REDIRECT".to_owned()),
            }),
        }
        Ok(ExternalOrder {
            order_id: format!("ext-{}", order.shop_order_id),
            status: "CREATED".to_owned(),
            payment_hash: (behavior != CreateBehavior::ApproveUnhashed)
                .then(|| format!("hash-{}", order.shop_order_id)),
            links,
        })
    }

    async fn payment_details(
        &self,
        external_order_id: &str,
    ) -> Result<PaymentDetails, GatewayError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
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

/// Details the fake gateway reports for a fully settled order.
pub fn settled_details(shop_order_id: &str, amount: Decimal, currency: &str) -> PaymentDetails {
    PaymentDetails {
        status: "success".to_owned(),
        code: Some("100".to_owned()),
        payment_id: Some(format!("pay-{shop_order_id}")),
        receipt: Receipt {
            shop_order_id: Some(shop_order_id.to_owned()),
            amount: Some(amount),
            currency_code: Some(currency.to_owned()),
        },
    }
}

pub fn checkout() -> CheckoutConfig {
    CheckoutConfig {
        currency: "GEL".to_owned(),
        locale: "ka".to_owned(),
        intent: PaymentIntent::Capture,
        success_url: "https://courses.test/payment/success".to_owned(),
        fail_url: "https://courses.test/payment/fail".to_owned(),
        callback_url: Some("https://courses.test/api/v1/payments/callback".to_owned()),
    }
}

pub fn caller(user_id: Uuid) -> Caller {
    Caller {
        user_id,
        email: None,
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub service: PaymentService,
    pub course: Course,
}

/// A service over a fresh in-memory store holding one 500 GEL course.
pub async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(FakeGateway::default());
    let course = Course {
        id: Uuid::new_v4(),
        title: "Rust for Payments".to_owned(),
        price: Some(Decimal::new(500, 0)),
    };
    store.put_course(course.clone()).await;
    let service = PaymentService::with_store(store.clone(), gateway.clone(), checkout());
    Fixture {
        store,
        gateway,
        service,
        course,
    }
}

/// Order store over a [`MemoryStore`] that can inject failures and
/// interleave a competing write.
pub struct InterceptingStore {
    inner: Arc<MemoryStore>,
    fail_redirect: AtomicBool,
    competing_hash: Mutex<Option<String>>,
}

impl InterceptingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_redirect: AtomicBool::new(false),
            competing_hash: Mutex::new(None),
        }
    }

    /// Make `mark_redirected` fail as if the database went away.
    pub fn fail_redirects(&self) {
        self.fail_redirect.store(true, Ordering::SeqCst);
    }

    /// Before the next status update, commit a non-terminal update carrying
    /// `hash`, as a callback racing on the same order would.
    pub fn interleave_hash(&self, hash: &str) {
        *self.competing_hash.lock().unwrap() = Some(hash.to_owned());
    }
}

#[async_trait]
impl OrderStore for InterceptingStore {
    async fn insert_order(&self, insert: PaymentOrderInsert) -> Result<PaymentOrder, StoreError> {
        self.inner.insert_order(insert).await
    }

    async fn order_by_shop_order_id(
        &self,
        shop_order_id: &str,
    ) -> Result<Option<PaymentOrder>, StoreError> {
        self.inner.order_by_shop_order_id(shop_order_id).await
    }

    async fn order_for_user(
        &self,
        user_id: Uuid,
        lookup: OrderLookup,
    ) -> Result<Option<PaymentOrder>, StoreError> {
        self.inner.order_for_user(user_id, lookup).await
    }

    async fn mark_redirected(
        &self,
        redirect: OrderRedirect,
    ) -> Result<Option<PaymentOrder>, StoreError> {
        if self.fail_redirect.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.mark_redirected(redirect).await
    }

    async fn update_status(
        &self,
        update: OrderStatusUpdate,
    ) -> Result<Option<PaymentOrder>, StoreError> {
        let competing = self.competing_hash.lock().unwrap().take();
        if let Some(hash) = competing {
            self.inner
                .update_status(OrderStatusUpdate {
                    shop_order_id: update.shop_order_id.clone(),
                    status: PaymentOrderStatus::Redirected,
                    description: "gateway callback: IN_PROGRESS".to_owned(),
                    external_order_id: None,
                    external_payment_id: None,
                    payment_hash: Some(hash),
                })
                .await?;
        }
        self.inner.update_status(update).await
    }

    async fn list_orders(&self, query: ListPaymentOrders) -> Result<Vec<PaymentOrder>, StoreError> {
        self.inner.list_orders(query).await
    }

    async fn stale_redirected_orders(
        &self,
        query: ListStaleRedirectedOrders,
    ) -> Result<Vec<PaymentOrder>, StoreError> {
        self.inner.stale_redirected_orders(query).await
    }

    async fn mark_checked(&self, cmd: MarkOrderChecked) -> Result<u64, StoreError> {
        self.inner.mark_checked(cmd).await
    }
}

/// Like [`fixture`], with orders going through an [`InterceptingStore`].
pub async fn intercepted_fixture() -> (Fixture, Arc<InterceptingStore>) {
    let fx = fixture().await;
    let orders = Arc::new(InterceptingStore::new(fx.store.clone()));
    let service = PaymentService::new(
        orders.clone(),
        fx.store.clone(),
        fx.store.clone(),
        fx.gateway.clone(),
        checkout(),
    );
    (Fixture { service, ..fx }, orders)
}
