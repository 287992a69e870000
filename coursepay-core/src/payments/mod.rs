//! Payment-order reconciliation.
//!
//! [`PaymentService`] drives an order through
//! `pending → redirected → {success | failed | cancelled}` from three
//! entry points: order creation, gateway callbacks and user-triggered
//! verification (plus the background sweeper, which reuses verification).
//!
//! Callback and verification may race on the same order. Both only ever
//! write through conditional store operations, so whichever lands first
//! wins and the loser re-reads what is stored.

mod callback;
mod create;
pub mod shop_order_id;
mod settle;
pub mod status;
mod verify;

#[cfg(test)]
pub(crate) mod testing;

pub use settle::Settlement;

use crate::config::CheckoutConfig;
use crate::entities::PaymentOrderStatus;
use crate::entities::enrollment::{MarkEnrollmentFailed, UpsertPaidEnrollment};
use crate::entities::payment_order::{OrderStatusUpdate, PaymentOrder};
use crate::gateway::{GatewayError, PaymentGateway};
use crate::store::{CourseCatalog, EnrollmentStore, OrderStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

/// Errors of the reconciliation entry points.
///
/// Each variant corresponds to one HTTP status at the API layer.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Missing or invalid caller identity.
    #[error("authentication required")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Course or order absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored data cannot be acted upon (e.g. a course without a price).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Integrity-hash mismatch or duplicate shop order id.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// The reconciliation state machine.
///
/// Holds no state of its own; cloning shares the stores and the gateway.
#[derive(Clone)]
pub struct PaymentService {
    orders: Arc<dyn OrderStore>,
    enrollments: Arc<dyn EnrollmentStore>,
    courses: Arc<dyn CourseCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    checkout: CheckoutConfig,
}

impl PaymentService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        enrollments: Arc<dyn EnrollmentStore>,
        courses: Arc<dyn CourseCatalog>,
        gateway: Arc<dyn PaymentGateway>,
        checkout: CheckoutConfig,
    ) -> Self {
        Self {
            orders,
            enrollments,
            courses,
            gateway,
            checkout,
        }
    }

    /// Build a service whose three stores are one object.
    pub fn with_store<S>(store: Arc<S>, gateway: Arc<dyn PaymentGateway>, checkout: CheckoutConfig) -> Self
    where
        S: OrderStore + EnrollmentStore + CourseCatalog + 'static,
    {
        Self::new(store.clone(), store.clone(), store, gateway, checkout)
    }

    pub fn orders(&self) -> &Arc<dyn OrderStore> {
        &self.orders
    }

    pub fn enrollments(&self) -> &Arc<dyn EnrollmentStore> {
        &self.enrollments
    }

    /// Write a status transition and fan it out to the enrollment.
    ///
    /// If the order was already terminal nothing is written and the stored
    /// order is returned instead, so the caller reports what actually won.
    /// A write refused because the payment hash differs is a conflict.
    async fn transition(&self, update: OrderStatusUpdate) -> Result<PaymentOrder, PaymentError> {
        let shop_order_id = update.shop_order_id.clone();
        let requested = update.status;
        let order = match self.orders.update_status(update).await? {
            Some(order) => {
                info!(
                    shop_order_id = %order.shop_order_id,
                    status = %order.status,
                    "Payment order status updated"
                );
                order
            }
            None => {
                let stored = self
                    .orders
                    .order_by_shop_order_id(&shop_order_id)
                    .await?
                    .ok_or_else(|| {
                        PaymentError::InvalidState(format!(
                            "order {shop_order_id} vanished during update"
                        ))
                    })?;
                // Still open, so the payment hash guard refused the write.
                if !stored.status.is_terminal() {
                    warn!(
                        shop_order_id = %shop_order_id,
                        "Payment hash changed under a concurrent update; rejecting"
                    );
                    return Err(PaymentError::Conflict("payment hash mismatch".to_owned()));
                }
                Self::report_late_outcome(&stored, requested);
                if stored.status != requested {
                    info!(
                        shop_order_id = %shop_order_id,
                        stored = %stored.status,
                        requested = %requested,
                        "Order already settled, keeping stored status"
                    );
                }
                stored
            }
        };
        self.sync_enrollment(&order).await?;
        Ok(order)
    }

    /// Mirror a terminal order onto its enrollment row.
    ///
    /// Idempotent: repeated calls for the same successful order leave the
    /// enrollment unchanged, which is what lets a duplicate callback heal
    /// a crash between the order write and the enrollment write.
    async fn sync_enrollment(&self, order: &PaymentOrder) -> Result<(), PaymentError> {
        match order.status {
            PaymentOrderStatus::Success => {
                self.enrollments
                    .upsert_paid(UpsertPaidEnrollment {
                        user_id: order.user_id,
                        course_id: order.course_id,
                        price_paid: order.amount,
                        payment_order_id: order.id,
                        external_order_id: order.external_order_id.clone(),
                        external_payment_id: order.external_payment_id.clone(),
                        paid_at: OffsetDateTime::now_utc(),
                    })
                    .await?;
                info!(
                    shop_order_id = %order.shop_order_id,
                    user_id = %order.user_id,
                    course_id = %order.course_id,
                    "Enrollment marked paid"
                );
            }
            PaymentOrderStatus::Failed | PaymentOrderStatus::Cancelled => {
                let touched = self
                    .enrollments
                    .mark_failed(MarkEnrollmentFailed {
                        user_id: order.user_id,
                        course_id: order.course_id,
                    })
                    .await?;
                if touched == 0 {
                    tracing::debug!(
                        shop_order_id = %order.shop_order_id,
                        "No enrollment to mark failed"
                    );
                }
            }
            PaymentOrderStatus::Pending | PaymentOrderStatus::Redirected => {}
        }
        Ok(())
    }

    /// Log a terminal outcome arriving for an order that already settled
    /// the other way.
    fn report_late_outcome(order: &PaymentOrder, incoming: PaymentOrderStatus) {
        if incoming == PaymentOrderStatus::Success && order.status != PaymentOrderStatus::Success {
            warn!(
                shop_order_id = %order.shop_order_id,
                stored = %order.status,
                "Gateway reports success for an order already settled as {}; manual review needed",
                order.status
            );
        }
    }
}
