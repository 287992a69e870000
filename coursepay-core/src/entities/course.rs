use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

/// A catalog entry. The catalog is owned by the website; this service only
/// reads the authoritative price from it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct GetCourseById {
    pub course_id: Uuid,
}

impl Processor<GetCourseById> for DatabaseProcessor {
    type Output = Option<Course>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetCourseById")]
    async fn process(&self, query: GetCourseById) -> Result<Option<Course>, sqlx::Error> {
        sqlx::query_as::<_, Course>("SELECT id, title, price FROM courses WHERE id = $1")
            .bind(query.course_id)
            .fetch_optional(&self.pool)
            .await
    }
}
