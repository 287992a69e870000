use super::{CourseCatalog, EnrollmentStore, OrderStore, StoreError};
use crate::entities::course::Course;
use crate::entities::enrollment::{
    DeleteEnrollment, Enrollment, ListEnrollments, MarkEnrollmentFailed, UpsertPaidEnrollment,
};
use crate::entities::payment_order::{
    ListPaymentOrders, ListStaleRedirectedOrders, MarkOrderChecked, OrderLookup, OrderRedirect,
    OrderStatusUpdate, PaymentOrder, PaymentOrderInsert,
};
use crate::entities::{EnrollmentPaymentStatus, PaymentOrderStatus};
use async_trait::async_trait;
use sqlx::types::Json;
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-process store with the same semantics as [`super::PgStore`].
///
/// Every operation holds a single lock for its whole duration, which gives
/// each call the row-level atomicity the SQL statements have.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    orders: HashMap<Uuid, PaymentOrder>,
    by_shop_order_id: HashMap<String, Uuid>,
    enrollments: HashMap<(Uuid, Uuid), Enrollment>,
    courses: HashMap<Uuid, Course>,
}

impl MemoryState {
    fn order_by_shop_order_id_mut(&mut self, shop_order_id: &str) -> Option<&mut PaymentOrder> {
        let id = self.by_shop_order_id.get(shop_order_id)?;
        self.orders.get_mut(id)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a catalog entry.
    pub async fn put_course(&self, course: Course) {
        self.state.lock().await.courses.insert(course.id, course);
    }

    /// Seed an enrollment row directly, bypassing reconciliation.
    pub async fn put_enrollment(&self, enrollment: Enrollment) {
        self.state
            .lock()
            .await
            .enrollments
            .insert((enrollment.user_id, enrollment.course_id), enrollment);
    }

    pub async fn enrollment(&self, user_id: Uuid, course_id: Uuid) -> Option<Enrollment> {
        self.state
            .lock()
            .await
            .enrollments
            .get(&(user_id, course_id))
            .cloned()
    }

    pub async fn enrollment_count(&self) -> usize {
        self.state.lock().await.enrollments.len()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Shift an order's `updated_at` into the past.
    pub async fn backdate_order(&self, shop_order_id: &str, by: time::Duration) {
        let mut state = self.state.lock().await;
        if let Some(order) = state.order_by_shop_order_id_mut(shop_order_id) {
            order.updated_at -= by;
            order.created_at -= by;
        }
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, insert: PaymentOrderInsert) -> Result<PaymentOrder, StoreError> {
        let mut state = self.state.lock().await;
        if state.by_shop_order_id.contains_key(&insert.shop_order_id) {
            return Err(StoreError::Duplicate(
                "payment_orders_shop_order_id_key".to_owned(),
            ));
        }

        let now = OffsetDateTime::now_utc();
        let order = PaymentOrder {
            id: Uuid::new_v4(),
            shop_order_id: insert.shop_order_id,
            user_id: insert.user_id,
            course_id: insert.course_id,
            course_title: insert.course_title,
            amount: insert.amount,
            currency_code: insert.currency_code,
            locale: insert.locale,
            intent: insert.intent,
            status: PaymentOrderStatus::Pending,
            status_description: None,
            external_order_id: None,
            external_payment_id: None,
            external_payment_hash: None,
            redirect_url: None,
            callback_url: insert.callback_url,
            metadata: Json(insert.metadata),
            last_checked_at: None,
            created_at: now,
            updated_at: now,
        };
        state
            .by_shop_order_id
            .insert(order.shop_order_id.clone(), order.id);
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn order_by_shop_order_id(
        &self,
        shop_order_id: &str,
    ) -> Result<Option<PaymentOrder>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .by_shop_order_id
            .get(shop_order_id)
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn order_for_user(
        &self,
        user_id: Uuid,
        lookup: OrderLookup,
    ) -> Result<Option<PaymentOrder>, StoreError> {
        let state = self.state.lock().await;
        let found = match lookup {
            OrderLookup::Internal(id) => state.orders.get(&id),
            OrderLookup::External(external) => state
                .orders
                .values()
                .find(|o| o.external_order_id.as_deref() == Some(external.as_str())),
        };
        Ok(found.filter(|o| o.user_id == user_id).cloned())
    }

    async fn mark_redirected(
        &self,
        redirect: OrderRedirect,
    ) -> Result<Option<PaymentOrder>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(order) = state.orders.get_mut(&redirect.order_id) else {
            return Ok(None);
        };
        if order.status != PaymentOrderStatus::Pending {
            return Ok(None);
        }
        order.status = PaymentOrderStatus::Redirected;
        order.status_description = Some("awaiting payment on gateway page".to_owned());
        order.external_order_id = Some(redirect.external_order_id);
        order.redirect_url = Some(redirect.redirect_url);
        if redirect.payment_hash.is_some() {
            order.external_payment_hash = redirect.payment_hash;
        }
        order.updated_at = OffsetDateTime::now_utc();
        Ok(Some(order.clone()))
    }

    async fn update_status(
        &self,
        update: OrderStatusUpdate,
    ) -> Result<Option<PaymentOrder>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(order) = state.order_by_shop_order_id_mut(&update.shop_order_id) else {
            return Ok(None);
        };
        if order.status.is_terminal() {
            return Ok(None);
        }
        if let (Some(stored), Some(received)) = (&order.external_payment_hash, &update.payment_hash)
            && stored != received
        {
            return Ok(None);
        }
        order.status = update.status;
        order.status_description = Some(update.description);
        if update.external_order_id.is_some() {
            order.external_order_id = update.external_order_id;
        }
        if update.external_payment_id.is_some() {
            order.external_payment_id = update.external_payment_id;
        }
        if update.payment_hash.is_some() {
            order.external_payment_hash = update.payment_hash;
        }
        order.updated_at = OffsetDateTime::now_utc();
        Ok(Some(order.clone()))
    }

    async fn list_orders(&self, query: ListPaymentOrders) -> Result<Vec<PaymentOrder>, StoreError> {
        let state = self.state.lock().await;
        let mut orders: Vec<PaymentOrder> = state
            .orders
            .values()
            .filter(|o| query.status.is_none_or(|s| o.status == s))
            .filter(|o| query.user_id.is_none_or(|u| o.user_id == u))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(0))
            .take(usize::try_from(query.limit).unwrap_or(0))
            .collect())
    }

    async fn stale_redirected_orders(
        &self,
        query: ListStaleRedirectedOrders,
    ) -> Result<Vec<PaymentOrder>, StoreError> {
        let state = self.state.lock().await;
        let mut orders: Vec<PaymentOrder> = state
            .orders
            .values()
            .filter(|o| o.status == PaymentOrderStatus::Redirected)
            .filter(|o| o.updated_at < query.older_than)
            .cloned()
            .collect();
        // `None < Some`, so never-checked orders sort first.
        orders.sort_by_key(|o| (o.last_checked_at, o.updated_at));
        orders.truncate(usize::try_from(query.limit).unwrap_or(0));
        Ok(orders)
    }

    async fn mark_checked(&self, cmd: MarkOrderChecked) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        match state.orders.get_mut(&cmd.order_id) {
            Some(order) if order.status == PaymentOrderStatus::Redirected => {
                order.last_checked_at = Some(OffsetDateTime::now_utc());
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn upsert_paid(&self, cmd: UpsertPaidEnrollment) -> Result<Enrollment, StoreError> {
        let mut state = self.state.lock().await;
        let now = OffsetDateTime::now_utc();
        let enrollment = state
            .enrollments
            .entry((cmd.user_id, cmd.course_id))
            .and_modify(|existing| {
                let same_settled_order = existing.payment_status.grants_access()
                    && existing.payment_order_id == Some(cmd.payment_order_id);
                if !same_settled_order {
                    existing.paid_at = Some(cmd.paid_at);
                }
                if existing.payment_status != EnrollmentPaymentStatus::Completed {
                    existing.payment_status = EnrollmentPaymentStatus::Paid;
                }
                existing.price_paid = Some(cmd.price_paid);
                existing.payment_order_id = Some(cmd.payment_order_id);
                if cmd.external_order_id.is_some() {
                    existing.external_order_id = cmd.external_order_id.clone();
                }
                if cmd.external_payment_id.is_some() {
                    existing.external_payment_id = cmd.external_payment_id.clone();
                }
                existing.updated_at = now;
            })
            .or_insert_with(|| Enrollment {
                user_id: cmd.user_id,
                course_id: cmd.course_id,
                payment_status: EnrollmentPaymentStatus::Paid,
                price_paid: Some(cmd.price_paid),
                payment_order_id: Some(cmd.payment_order_id),
                external_order_id: cmd.external_order_id.clone(),
                external_payment_id: cmd.external_payment_id.clone(),
                paid_at: Some(cmd.paid_at),
                created_at: now,
                updated_at: now,
            });
        Ok(enrollment.clone())
    }

    async fn mark_failed(&self, cmd: MarkEnrollmentFailed) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        match state.enrollments.get_mut(&(cmd.user_id, cmd.course_id)) {
            Some(existing) if !existing.payment_status.grants_access() => {
                existing.payment_status = EnrollmentPaymentStatus::Failed;
                existing.updated_at = OffsetDateTime::now_utc();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn list_enrollments(
        &self,
        query: ListEnrollments,
    ) -> Result<Vec<Enrollment>, StoreError> {
        let state = self.state.lock().await;
        let mut enrollments: Vec<Enrollment> = state
            .enrollments
            .values()
            .filter(|e| query.user_id.is_none_or(|u| e.user_id == u))
            .filter(|e| query.course_id.is_none_or(|c| e.course_id == c))
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(enrollments)
    }

    async fn delete_enrollment(&self, cmd: DeleteEnrollment) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state
            .enrollments
            .remove(&(cmd.user_id, cmd.course_id))
            .is_some())
    }
}

#[async_trait]
impl CourseCatalog for MemoryStore {
    async fn course(&self, course_id: Uuid) -> Result<Option<Course>, StoreError> {
        Ok(self.state.lock().await.courses.get(&course_id).cloned())
    }
}
