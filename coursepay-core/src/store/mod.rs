//! Storage seams of the reconciliation core.
//!
//! The payment service only ever talks to these traits. [`PgStore`] backs
//! them with PostgreSQL; [`MemoryStore`] keeps the same conditional-update
//! and upsert semantics in process for tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::entities::course::Course;
use crate::entities::enrollment::{
    DeleteEnrollment, Enrollment, ListEnrollments, MarkEnrollmentFailed, UpsertPaidEnrollment,
};
use crate::entities::payment_order::{
    ListPaymentOrders, ListStaleRedirectedOrders, MarkOrderChecked, OrderLookup, OrderRedirect,
    OrderStatusUpdate, PaymentOrder, PaymentOrderInsert,
};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key already exists.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// Database error
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let unique_violation = err
            .as_database_error()
            .filter(|db| db.is_unique_violation())
            .map(|db| db.constraint().unwrap_or("unique constraint").to_owned());
        match unique_violation {
            Some(constraint) => StoreError::Duplicate(constraint),
            None => StoreError::Database(err),
        }
    }
}

/// Durable table of payment orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new `pending` order. Fails with [`StoreError::Duplicate`]
    /// when the shop order id is taken.
    async fn insert_order(&self, insert: PaymentOrderInsert) -> Result<PaymentOrder, StoreError>;

    async fn order_by_shop_order_id(
        &self,
        shop_order_id: &str,
    ) -> Result<Option<PaymentOrder>, StoreError>;

    /// Find an order owned by `user_id`.
    async fn order_for_user(
        &self,
        user_id: Uuid,
        lookup: OrderLookup,
    ) -> Result<Option<PaymentOrder>, StoreError>;

    /// `pending → redirected`. Returns `None` if the order is no longer
    /// pending.
    async fn mark_redirected(
        &self,
        redirect: OrderRedirect,
    ) -> Result<Option<PaymentOrder>, StoreError>;

    /// Apply a status transition unless the order is already terminal.
    /// When both the stored and the incoming payment hash are present they
    /// must match. Returns `None` if nothing was written.
    async fn update_status(
        &self,
        update: OrderStatusUpdate,
    ) -> Result<Option<PaymentOrder>, StoreError>;

    async fn list_orders(&self, query: ListPaymentOrders) -> Result<Vec<PaymentOrder>, StoreError>;

    async fn stale_redirected_orders(
        &self,
        query: ListStaleRedirectedOrders,
    ) -> Result<Vec<PaymentOrder>, StoreError>;

    /// Record that the sweeper looked at a still-`redirected` order.
    async fn mark_checked(&self, cmd: MarkOrderChecked) -> Result<u64, StoreError>;
}

/// Durable table of (user, course) enrollments, unique on the pair.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Insert-or-update by (user, course) as a single atomic operation.
    async fn upsert_paid(&self, cmd: UpsertPaidEnrollment) -> Result<Enrollment, StoreError>;

    /// Update (never insert) an existing enrollment to `failed`.
    async fn mark_failed(&self, cmd: MarkEnrollmentFailed) -> Result<u64, StoreError>;

    async fn list_enrollments(&self, query: ListEnrollments)
    -> Result<Vec<Enrollment>, StoreError>;

    async fn delete_enrollment(&self, cmd: DeleteEnrollment) -> Result<bool, StoreError>;
}

/// Read access to the course catalog.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn course(&self, course_id: Uuid) -> Result<Option<Course>, StoreError>;
}
