use crate::entities::EnrollmentPaymentStatus;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Enrollment {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub payment_status: EnrollmentPaymentStatus,
    pub price_paid: Option<Decimal>,
    pub payment_order_id: Option<Uuid>,
    pub external_order_id: Option<String>,
    pub external_payment_id: Option<String>,
    pub paid_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Record a successful payment for (user, course).
///
/// Inserts or updates by the unique (user_id, course_id) key. Running it
/// again for the same order leaves the row unchanged, `paid_at` included.
/// A `completed` enrollment keeps its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertPaidEnrollment {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub price_paid: Decimal,
    pub payment_order_id: Uuid,
    pub external_order_id: Option<String>,
    pub external_payment_id: Option<String>,
    pub paid_at: OffsetDateTime,
}

const ENROLLMENT_COLUMNS: &str = r#"
    user_id,
    course_id,
    payment_status,
    price_paid,
    payment_order_id,
    external_order_id,
    external_payment_id,
    paid_at,
    created_at,
    updated_at
"#;

impl Processor<UpsertPaidEnrollment> for DatabaseProcessor {
    type Output = Enrollment;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertPaidEnrollment")]
    async fn process(&self, cmd: UpsertPaidEnrollment) -> Result<Enrollment, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO enrollments
            (user_id, course_id, payment_status, price_paid, payment_order_id,
             external_order_id, external_payment_id, paid_at)
            VALUES ($1, $2, 'paid', $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, course_id) DO UPDATE SET
                payment_status = CASE
                    WHEN enrollments.payment_status = 'completed' THEN enrollments.payment_status
                    ELSE 'paid'
                END,
                price_paid = EXCLUDED.price_paid,
                payment_order_id = EXCLUDED.payment_order_id,
                external_order_id = COALESCE(EXCLUDED.external_order_id, enrollments.external_order_id),
                external_payment_id = COALESCE(EXCLUDED.external_payment_id, enrollments.external_payment_id),
                paid_at = CASE
                    WHEN enrollments.payment_status IN ('paid', 'completed')
                     AND enrollments.payment_order_id = EXCLUDED.payment_order_id
                    THEN enrollments.paid_at
                    ELSE EXCLUDED.paid_at
                END,
                updated_at = NOW()
            RETURNING {ENROLLMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Enrollment>(&sql)
            .bind(cmd.user_id)
            .bind(cmd.course_id)
            .bind(cmd.price_paid)
            .bind(cmd.payment_order_id)
            .bind(cmd.external_order_id)
            .bind(cmd.external_payment_id)
            .bind(cmd.paid_at)
            .fetch_one(&self.pool)
            .await
    }
}

/// Record a declined attempt on an existing enrollment.
///
/// Never inserts, and never touches a row that already grants access.
/// Returns the number of rows updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkEnrollmentFailed {
    pub user_id: Uuid,
    pub course_id: Uuid,
}

impl Processor<MarkEnrollmentFailed> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:MarkEnrollmentFailed")]
    async fn process(&self, cmd: MarkEnrollmentFailed) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE enrollments
            SET payment_status = 'failed', updated_at = NOW()
            WHERE user_id = $1
              AND course_id = $2
              AND payment_status NOT IN ('paid', 'completed')
            "#,
        )
        .bind(cmd.user_id)
        .bind(cmd.course_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListEnrollments {
    pub user_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
}

impl Processor<ListEnrollments> for DatabaseProcessor {
    type Output = Vec<Enrollment>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListEnrollments")]
    async fn process(&self, query: ListEnrollments) -> Result<Vec<Enrollment>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {ENROLLMENT_COLUMNS}
            FROM enrollments
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR course_id = $2)
            ORDER BY updated_at DESC
            "#
        );
        sqlx::query_as::<_, Enrollment>(&sql)
            .bind(query.user_id)
            .bind(query.course_id)
            .fetch_all(&self.pool)
            .await
    }
}

/// Admin-only removal of an enrollment. Returns whether a row existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEnrollment {
    pub user_id: Uuid,
    pub course_id: Uuid,
}

impl Processor<DeleteEnrollment> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteEnrollment")]
    async fn process(&self, cmd: DeleteEnrollment) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM enrollments WHERE user_id = $1 AND course_id = $2")
            .bind(cmd.user_id)
            .bind(cmd.course_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
