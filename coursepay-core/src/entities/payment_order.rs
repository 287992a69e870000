use crate::entities::{PaymentIntent, PaymentOrderStatus};
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PaymentOrder {
    pub id: Uuid,
    pub shop_order_id: String,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub amount: Decimal,
    pub currency_code: String,
    pub locale: String,
    pub intent: PaymentIntent,
    pub status: PaymentOrderStatus,
    pub status_description: Option<String>,
    pub external_order_id: Option<String>,
    pub external_payment_id: Option<String>,
    pub external_payment_hash: Option<String>,
    pub redirect_url: Option<String>,
    pub callback_url: Option<String>,
    pub metadata: Json<OrderMetadata>,
    /// Last time the stale-order sweeper asked the gateway about this order.
    pub last_checked_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Payment-method parameters carried alongside the order.
///
/// None of these influence the amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_months: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
}

/// Data for inserting a new payment order. The row starts `pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOrderInsert {
    pub shop_order_id: String,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub amount: Decimal,
    pub currency_code: String,
    pub locale: String,
    pub intent: PaymentIntent,
    pub callback_url: Option<String>,
    pub metadata: OrderMetadata,
}

/// How a caller refers to an order when verifying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLookup {
    /// Gateway-assigned order id.
    External(String),
    /// Internal primary key.
    Internal(Uuid),
}

/// A status transition requested by one of the reconciliation paths.
///
/// `None` fields leave the stored value untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStatusUpdate {
    pub shop_order_id: String,
    pub status: PaymentOrderStatus,
    pub description: String,
    pub external_order_id: Option<String>,
    pub external_payment_id: Option<String>,
    pub payment_hash: Option<String>,
}

/// The gateway accepted the order and produced a hosted payment page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRedirect {
    pub order_id: Uuid,
    pub external_order_id: String,
    pub redirect_url: String,
    pub payment_hash: Option<String>,
}

const ORDER_COLUMNS: &str = r#"
    id,
    shop_order_id,
    user_id,
    course_id,
    course_title,
    amount,
    currency_code,
    locale,
    intent,
    status,
    status_description,
    external_order_id,
    external_payment_id,
    external_payment_hash,
    redirect_url,
    callback_url,
    metadata,
    last_checked_at,
    created_at,
    updated_at
"#;

impl Processor<PaymentOrderInsert> for DatabaseProcessor {
    type Output = PaymentOrder;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertPaymentOrder")]
    async fn process(&self, insert: PaymentOrderInsert) -> Result<PaymentOrder, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO payment_orders
            (id, shop_order_id, user_id, course_id, course_title, amount, currency_code,
             locale, intent, status, callback_url, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10, $11)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let order = sqlx::query_as::<_, PaymentOrder>(&sql)
            .bind(Uuid::new_v4())
            .bind(insert.shop_order_id)
            .bind(insert.user_id)
            .bind(insert.course_id)
            .bind(insert.course_title)
            .bind(insert.amount)
            .bind(insert.currency_code)
            .bind(insert.locale)
            .bind(insert.intent)
            .bind(insert.callback_url)
            .bind(Json(insert.metadata))
            .fetch_one(&self.pool)
            .await?;
        Ok(order)
    }
}

#[derive(Debug, Clone)]
pub struct GetPaymentOrderByShopOrderId {
    pub shop_order_id: String,
}

impl Processor<GetPaymentOrderByShopOrderId> for DatabaseProcessor {
    type Output = Option<PaymentOrder>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPaymentOrderByShopOrderId")]
    async fn process(
        &self,
        query: GetPaymentOrderByShopOrderId,
    ) -> Result<Option<PaymentOrder>, sqlx::Error> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM payment_orders WHERE shop_order_id = $1");
        sqlx::query_as::<_, PaymentOrder>(&sql)
            .bind(query.shop_order_id)
            .fetch_optional(&self.pool)
            .await
    }
}

/// Find an order owned by `user_id`. Orders of other users are invisible.
#[derive(Debug, Clone)]
pub struct GetPaymentOrderForUser {
    pub user_id: Uuid,
    pub lookup: OrderLookup,
}

impl Processor<GetPaymentOrderForUser> for DatabaseProcessor {
    type Output = Option<PaymentOrder>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPaymentOrderForUser")]
    async fn process(
        &self,
        query: GetPaymentOrderForUser,
    ) -> Result<Option<PaymentOrder>, sqlx::Error> {
        match query.lookup {
            OrderLookup::External(external_order_id) => {
                let sql = format!(
                    "SELECT {ORDER_COLUMNS} FROM payment_orders \
                     WHERE external_order_id = $1 AND user_id = $2"
                );
                sqlx::query_as::<_, PaymentOrder>(&sql)
                    .bind(external_order_id)
                    .bind(query.user_id)
                    .fetch_optional(&self.pool)
                    .await
            }
            OrderLookup::Internal(id) => {
                let sql = format!(
                    "SELECT {ORDER_COLUMNS} FROM payment_orders WHERE id = $1 AND user_id = $2"
                );
                sqlx::query_as::<_, PaymentOrder>(&sql)
                    .bind(id)
                    .bind(query.user_id)
                    .fetch_optional(&self.pool)
                    .await
            }
        }
    }
}

impl Processor<OrderRedirect> for DatabaseProcessor {
    type Output = Option<PaymentOrder>;
    type Error = sqlx::Error;
    /// Only a `pending` order can become `redirected`.
    #[tracing::instrument(skip_all, err, name = "SQL:MarkPaymentOrderRedirected")]
    async fn process(&self, cmd: OrderRedirect) -> Result<Option<PaymentOrder>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE payment_orders
            SET status = 'redirected',
                status_description = 'awaiting payment on gateway page',
                external_order_id = $2,
                redirect_url = $3,
                external_payment_hash = COALESCE($4, external_payment_hash),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {ORDER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, PaymentOrder>(&sql)
            .bind(cmd.order_id)
            .bind(cmd.external_order_id)
            .bind(cmd.redirect_url)
            .bind(cmd.payment_hash)
            .fetch_optional(&self.pool)
            .await
    }
}

impl Processor<OrderStatusUpdate> for DatabaseProcessor {
    type Output = Option<PaymentOrder>;
    type Error = sqlx::Error;
    /// Conditional on the stored status still being non-terminal and, when
    /// both sides carry one, on the payment hash matching. Returns `None`
    /// when either condition failed.
    #[tracing::instrument(skip_all, err, name = "SQL:UpdatePaymentOrderStatus")]
    async fn process(&self, cmd: OrderStatusUpdate) -> Result<Option<PaymentOrder>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE payment_orders
            SET status = $2,
                status_description = $3,
                external_order_id = COALESCE($4, external_order_id),
                external_payment_id = COALESCE($5, external_payment_id),
                external_payment_hash = COALESCE($6, external_payment_hash),
                updated_at = NOW()
            WHERE shop_order_id = $1
              AND status IN ('pending', 'redirected')
              AND (external_payment_hash IS NULL OR $6::text IS NULL OR external_payment_hash = $6)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, PaymentOrder>(&sql)
            .bind(cmd.shop_order_id)
            .bind(cmd.status)
            .bind(cmd.description)
            .bind(cmd.external_order_id)
            .bind(cmd.external_payment_id)
            .bind(cmd.payment_hash)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListPaymentOrders {
    pub status: Option<PaymentOrderStatus>,
    pub user_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

impl Processor<ListPaymentOrders> for DatabaseProcessor {
    type Output = Vec<PaymentOrder>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListPaymentOrders")]
    async fn process(&self, query: ListPaymentOrders) -> Result<Vec<PaymentOrder>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM payment_orders
            WHERE ($1::payment_order_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        );
        sqlx::query_as::<_, PaymentOrder>(&sql)
            .bind(query.status)
            .bind(query.user_id)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await
    }
}

/// Orders handed to the gateway before `older_than` that never settled.
///
/// Orders the sweeper has never checked come first, then the ones checked
/// longest ago, so undecided orders cannot hold the head of the queue.
#[derive(Debug, Clone)]
pub struct ListStaleRedirectedOrders {
    pub older_than: OffsetDateTime,
    pub limit: i64,
}

impl Processor<ListStaleRedirectedOrders> for DatabaseProcessor {
    type Output = Vec<PaymentOrder>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListStaleRedirectedOrders")]
    async fn process(
        &self,
        query: ListStaleRedirectedOrders,
    ) -> Result<Vec<PaymentOrder>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM payment_orders
            WHERE status = 'redirected' AND updated_at < $1
            ORDER BY last_checked_at ASC NULLS FIRST, updated_at ASC
            LIMIT $2
            "#
        );
        sqlx::query_as::<_, PaymentOrder>(&sql)
            .bind(query.older_than)
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await
    }
}

/// Stamp `last_checked_at` on an order that is still `redirected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkOrderChecked {
    pub order_id: Uuid,
}

impl Processor<MarkOrderChecked> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:MarkOrderChecked")]
    async fn process(&self, cmd: MarkOrderChecked) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payment_orders
            SET last_checked_at = NOW()
            WHERE id = $1 AND status = 'redirected'
            "#,
        )
        .bind(cmd.order_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
