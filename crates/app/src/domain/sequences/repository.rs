//! Sequence Counters Repository

use sqlx::{Postgres, Row, Transaction, query};

use crate::domain::sequences::records::DocumentNumber;

const ENSURE_COUNTER_SQL: &str = include_str!("sql/ensure_counter.sql");
const LOCK_COUNTER_SQL: &str = include_str!("sql/lock_counter.sql");
const ADVANCE_COUNTER_SQL: &str = include_str!("sql/advance_counter.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgSequencesRepository;

impl PgSequencesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Issue the next document number for the tenant's `(year)` counter.
    ///
    /// Runs entirely on the caller's transaction: the counter row is seeded
    /// at zero when absent, locked with `FOR UPDATE`, read, and written back
    /// incremented. The lock is released only on commit or rollback, so the
    /// whole read-compute-write section is serialised per `(tenant, year)`
    /// and a rollback of the surrounding document insert also rolls back the
    /// increment, so committed numbers stay contiguous.
    pub(crate) async fn next_document_number(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        year: i32,
        prefix: &str,
    ) -> Result<DocumentNumber, sqlx::Error> {
        query(ENSURE_COUNTER_SQL)
            .bind(year)
            .bind(prefix)
            .execute(&mut **tx)
            .await?;

        let row = query(LOCK_COUNTER_SQL)
            .bind(year)
            .fetch_one(&mut **tx)
            .await?;

        let current: i64 = row.try_get("current_number")?;
        let stored_prefix: String = row.try_get("prefix")?;

        let next = current + 1;

        query(ADVANCE_COUNTER_SQL)
            .bind(year)
            .bind(next)
            .execute(&mut **tx)
            .await?;

        Ok(DocumentNumber::new(&stored_prefix, year, next))
    }
}
