use sqlx::PgPool;

/// Executes the SQL commands defined in [`crate::entities`].
///
/// Each command is a plain struct with a `kanau` [`Processor`] impl on this
/// type, so a handler reads as a sequence of named statements.
///
/// [`Processor`]: kanau::processor::Processor
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
