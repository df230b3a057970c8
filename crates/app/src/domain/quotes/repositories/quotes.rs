//! Quotes Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    customers::records::CustomerUuid,
    quotes::records::{QuoteRecord, QuoteStatus, QuoteTotals, QuoteUuid},
};

const CREATE_QUOTE_SQL: &str = include_str!("../sql/create_quote.sql");
const GET_QUOTE_SQL: &str = include_str!("../sql/get_quote.sql");
const UPDATE_QUOTE_TOTALS_SQL: &str = include_str!("../sql/update_quote_totals.sql");
const UPDATE_QUOTE_STATUS_SQL: &str = include_str!("../sql/update_quote_status.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgQuotesRepository;

impl PgQuotesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
        customer: CustomerUuid,
        quote_number: &str,
    ) -> Result<QuoteRecord, sqlx::Error> {
        query_as::<Postgres, QuoteRecord>(CREATE_QUOTE_SQL)
            .bind(quote.into_uuid())
            .bind(customer.into_uuid())
            .bind(quote_number)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
    ) -> Result<QuoteRecord, sqlx::Error> {
        query_as::<Postgres, QuoteRecord>(GET_QUOTE_SQL)
            .bind(quote.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_totals(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
        totals: QuoteTotals,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(UPDATE_QUOTE_TOTALS_SQL)
            .bind(quote.into_uuid())
            .bind(amount_to_i64(totals.subtotal))
            .bind(amount_to_i64(totals.tax_total))
            .bind(amount_to_i64(totals.total))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn set_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
        status: QuoteStatus,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(UPDATE_QUOTE_STATUS_SQL)
            .bind(quote.into_uuid())
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for QuoteRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let subtotal = try_get_amount(row, "subtotal")?;
        let tax_total = try_get_amount(row, "tax_total")?;
        let total = try_get_amount(row, "total")?;

        let status_raw: String = row.try_get("status")?;

        let status =
            QuoteStatus::parse(&status_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: format!("unknown quote status {status_raw:?}").into(),
            })?;

        let quote_items_count: i64 = row.try_get("quote_items_count")?;

        Ok(Self {
            uuid: QuoteUuid::from_uuid(row.try_get("uuid")?),
            quote_number: row.try_get("quote_number")?,
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            status,
            subtotal,
            tax_total,
            total,
            items: Vec::with_capacity(usize::try_from(quote_items_count).unwrap_or_default()),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            deleted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("deleted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}

pub(super) fn try_get_amount(row: &PgRow, col: &str) -> Result<u64, sqlx::Error> {
    let amount_i64: i64 = row.try_get(col)?;

    u64::try_from(amount_i64).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

pub(super) fn amount_to_i64(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}
