//! Quote Items Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    catalog::records::CatalogItemUuid,
    quotes::{
        data::QuoteItemSnapshot,
        records::{QuoteItemRecord, QuoteItemUuid, QuoteTotals, QuoteUuid},
    },
};

use super::quotes::{amount_to_i64, try_get_amount};

const CREATE_QUOTE_ITEM_SQL: &str = include_str!("../sql/create_quote_item.sql");
const LIST_QUOTE_ITEMS_SQL: &str = include_str!("../sql/list_quote_items.sql");
const DELETE_QUOTE_ITEM_SQL: &str = include_str!("../sql/delete_quote_item.sql");
const SUM_QUOTE_ITEMS_SQL: &str = include_str!("../sql/sum_quote_items.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgQuoteItemsRepository;

impl PgQuoteItemsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
        item: QuoteItemSnapshot,
    ) -> Result<QuoteItemRecord, sqlx::Error> {
        query_as::<Postgres, QuoteItemRecord>(CREATE_QUOTE_ITEM_SQL)
            .bind(item.uuid.into_uuid())
            .bind(quote.into_uuid())
            .bind(item.catalog_item_uuid.into_uuid())
            .bind(item.description)
            .bind(item.unit)
            .bind(item.quantity)
            .bind(amount_to_i64(item.unit_price))
            .bind(item.tax_rate_bps)
            .bind(amount_to_i64(item.line_subtotal))
            .bind(amount_to_i64(item.line_tax))
            .bind(amount_to_i64(item.line_total))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
    ) -> Result<Vec<QuoteItemRecord>, sqlx::Error> {
        query_as::<Postgres, QuoteItemRecord>(LIST_QUOTE_ITEMS_SQL)
            .bind(quote.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn delete_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
        item: QuoteItemUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_QUOTE_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(quote.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Sum the current items from scratch.
    ///
    /// Header totals are always re-derived from this, never adjusted
    /// incrementally, so rounding or partial failures cannot accumulate
    /// drift.
    pub(crate) async fn sum_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
    ) -> Result<QuoteTotals, sqlx::Error> {
        let row = query(SUM_QUOTE_ITEMS_SQL)
            .bind(quote.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(QuoteTotals {
            subtotal: try_get_amount(&row, "subtotal")?,
            tax_total: try_get_amount(&row, "tax_total")?,
            total: try_get_amount(&row, "total")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for QuoteItemRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: QuoteItemUuid::from_uuid(row.try_get("uuid")?),
            catalog_item_uuid: CatalogItemUuid::from_uuid(row.try_get("catalog_item_uuid")?),
            description: row.try_get("description")?,
            unit: row.try_get("unit")?,
            quantity: row.try_get("quantity")?,
            unit_price: try_get_amount(row, "unit_price")?,
            tax_rate_bps: row.try_get("tax_rate_bps")?,
            line_subtotal: try_get_amount(row, "line_subtotal")?,
            line_tax: try_get_amount(row, "line_tax")?,
            line_total: try_get_amount(row, "line_total")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
