//! Catalog Items Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::catalog::{
    data::NewCatalogItem,
    records::{CatalogItemRecord, CatalogItemUuid, CategoryUuid},
};

const CREATE_CATALOG_ITEM_SQL: &str = include_str!("../sql/create_catalog_item.sql");
const GET_CATALOG_ITEM_SQL: &str = include_str!("../sql/get_catalog_item.sql");
const FIND_CATALOG_ITEM_ANY_SQL: &str = include_str!("../sql/find_catalog_item_any.sql");
const DELETE_CATALOG_ITEM_SQL: &str = include_str!("../sql/delete_catalog_item.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCatalogItemsRepository;

impl PgCatalogItemsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: NewCatalogItem,
    ) -> Result<CatalogItemRecord, sqlx::Error> {
        let unit_price = price_to_i64(item.unit_price)?;

        query_as::<Postgres, CatalogItemRecord>(CREATE_CATALOG_ITEM_SQL)
            .bind(item.uuid.into_uuid())
            .bind(item.category_uuid.map(CategoryUuid::into_uuid))
            .bind(item.name)
            .bind(item.unit)
            .bind(unit_price)
            .bind(item.tax_rate_bps)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: CatalogItemUuid,
    ) -> Result<CatalogItemRecord, sqlx::Error> {
        query_as::<Postgres, CatalogItemRecord>(GET_CATALOG_ITEM_SQL)
            .bind(item.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Find an item regardless of soft-delete state.
    ///
    /// Quote creation needs the distinction between "never existed" (the
    /// item is skipped) and "exists but is no longer valid" (hard error).
    pub(crate) async fn find_item_any(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: CatalogItemUuid,
    ) -> Result<Option<CatalogItemRecord>, sqlx::Error> {
        query_as::<Postgres, CatalogItemRecord>(FIND_CATALOG_ITEM_ANY_SQL)
            .bind(item.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn delete_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: CatalogItemUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_CATALOG_ITEM_SQL)
            .bind(item.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for CatalogItemRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let unit_price = try_get_amount(row, "unit_price")?;

        Ok(Self {
            uuid: CatalogItemUuid::from_uuid(row.try_get("uuid")?),
            category_uuid: row
                .try_get::<Option<uuid::Uuid>, _>("category_uuid")?
                .map(CategoryUuid::from_uuid),
            name: row.try_get("name")?,
            unit: row.try_get("unit")?,
            unit_price,
            tax_rate_bps: row.try_get("tax_rate_bps")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            deleted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("deleted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}

pub(crate) fn try_get_amount(row: &PgRow, col: &str) -> Result<u64, sqlx::Error> {
    let amount_i64: i64 = row.try_get(col)?;

    u64::try_from(amount_i64).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn price_to_i64(price: u64) -> Result<i64, sqlx::Error> {
    i64::try_from(price).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}
