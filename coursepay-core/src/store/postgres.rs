use super::{CourseCatalog, EnrollmentStore, OrderStore, StoreError};
use crate::entities::course::{Course, GetCourseById};
use crate::entities::enrollment::{
    DeleteEnrollment, Enrollment, ListEnrollments, MarkEnrollmentFailed, UpsertPaidEnrollment,
};
use crate::entities::payment_order::{
    GetPaymentOrderByShopOrderId, GetPaymentOrderForUser, ListPaymentOrders,
    ListStaleRedirectedOrders, MarkOrderChecked, OrderLookup, OrderRedirect, OrderStatusUpdate,
    PaymentOrder, PaymentOrderInsert,
};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL-backed store. Uniqueness and conditional updates are enforced
/// by the schema in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgStore {
    processor: DatabaseProcessor,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor { pool },
        }
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, insert: PaymentOrderInsert) -> Result<PaymentOrder, StoreError> {
        Ok(self.processor.process(insert).await?)
    }

    async fn order_by_shop_order_id(
        &self,
        shop_order_id: &str,
    ) -> Result<Option<PaymentOrder>, StoreError> {
        Ok(self
            .processor
            .process(GetPaymentOrderByShopOrderId {
                shop_order_id: shop_order_id.to_owned(),
            })
            .await?)
    }

    async fn order_for_user(
        &self,
        user_id: Uuid,
        lookup: OrderLookup,
    ) -> Result<Option<PaymentOrder>, StoreError> {
        Ok(self
            .processor
            .process(GetPaymentOrderForUser { user_id, lookup })
            .await?)
    }

    async fn mark_redirected(
        &self,
        redirect: OrderRedirect,
    ) -> Result<Option<PaymentOrder>, StoreError> {
        Ok(self.processor.process(redirect).await?)
    }

    async fn update_status(
        &self,
        update: OrderStatusUpdate,
    ) -> Result<Option<PaymentOrder>, StoreError> {
        Ok(self.processor.process(update).await?)
    }

    async fn list_orders(&self, query: ListPaymentOrders) -> Result<Vec<PaymentOrder>, StoreError> {
        Ok(self.processor.process(query).await?)
    }

    async fn stale_redirected_orders(
        &self,
        query: ListStaleRedirectedOrders,
    ) -> Result<Vec<PaymentOrder>, StoreError> {
        Ok(self.processor.process(query).await?)
    }

    async fn mark_checked(&self, cmd: MarkOrderChecked) -> Result<u64, StoreError> {
        Ok(self.processor.process(cmd).await?)
    }
}

#[async_trait]
impl EnrollmentStore for PgStore {
    async fn upsert_paid(&self, cmd: UpsertPaidEnrollment) -> Result<Enrollment, StoreError> {
        Ok(self.processor.process(cmd).await?)
    }

    async fn mark_failed(&self, cmd: MarkEnrollmentFailed) -> Result<u64, StoreError> {
        Ok(self.processor.process(cmd).await?)
    }

    async fn list_enrollments(
        &self,
        query: ListEnrollments,
    ) -> Result<Vec<Enrollment>, StoreError> {
        Ok(self.processor.process(query).await?)
    }

    async fn delete_enrollment(&self, cmd: DeleteEnrollment) -> Result<bool, StoreError> {
        Ok(self.processor.process(cmd).await?)
    }
}

#[async_trait]
impl CourseCatalog for PgStore {
    async fn course(&self, course_id: Uuid) -> Result<Option<Course>, StoreError> {
        Ok(self.processor.process(GetCourseById { course_id }).await?)
    }
}
