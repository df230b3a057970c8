//! Quotes service.

use async_trait::async_trait;
use jiff::tz::TimeZone;
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::info;

use crate::{
    database::Db,
    domain::{
        catalog::PgCatalogItemsRepository,
        customers::PgCustomersRepository,
        quotes::{
            amounts,
            data::{NewQuote, NewQuoteItem, QuoteItemSnapshot},
            errors::QuotesServiceError,
            records::{QuoteItemRecord, QuoteItemUuid, QuoteRecord, QuoteStatus, QuoteUuid},
            repositories::{PgQuoteItemsRepository, PgQuotesRepository},
        },
        sequences::PgSequencesRepository,
        settings::PgSettingsRepository,
        tenants::records::TenantUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgQuotesService {
    db: Db,
    quotes: PgQuotesRepository,
    items: PgQuoteItemsRepository,
    customers: PgCustomersRepository,
    catalog: PgCatalogItemsRepository,
    settings: PgSettingsRepository,
    sequences: PgSequencesRepository,
}

impl PgQuotesService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            quotes: PgQuotesRepository::new(),
            items: PgQuoteItemsRepository::new(),
            customers: PgCustomersRepository::new(),
            catalog: PgCatalogItemsRepository::new(),
            settings: PgSettingsRepository::new(),
            sequences: PgSequencesRepository::new(),
        }
    }

    /// Snapshot one requested line against the catalog.
    ///
    /// `Ok(None)` means the line is skipped (non-positive quantity or the
    /// catalog reference never resolved); a catalog row that resolves but is
    /// soft-deleted aborts the whole creation instead.
    async fn snapshot_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: &NewQuoteItem,
    ) -> Result<Option<QuoteItemSnapshot>, QuotesServiceError> {
        if item.quantity <= 0 {
            return Ok(None);
        }

        let Some(catalog_item) = self.catalog.find_item_any(tx, item.catalog_item_uuid).await?
        else {
            return Ok(None);
        };

        if catalog_item.deleted_at.is_some() {
            return Err(QuotesServiceError::IneligibleCatalogItem);
        }

        let line_subtotal = amounts::line_subtotal(item.quantity, catalog_item.unit_price);
        let line_tax = amounts::line_tax(line_subtotal, catalog_item.tax_rate_bps);

        Ok(Some(QuoteItemSnapshot {
            uuid: item.uuid,
            catalog_item_uuid: item.catalog_item_uuid,
            description: catalog_item.name,
            unit: catalog_item.unit,
            quantity: item.quantity,
            unit_price: catalog_item.unit_price,
            tax_rate_bps: catalog_item.tax_rate_bps,
            line_subtotal,
            line_tax,
            line_total: line_subtotal + line_tax,
        }))
    }

    /// Re-derive the header totals from all current item rows.
    async fn recompute_totals(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
    ) -> Result<(), QuotesServiceError> {
        let totals = self.items.sum_items(tx, quote).await?;

        let rows_affected = self.quotes.update_totals(tx, quote, totals).await?;

        if rows_affected == 0 {
            return Err(QuotesServiceError::NotFound);
        }

        Ok(())
    }

    async fn editable_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote: QuoteUuid,
    ) -> Result<QuoteRecord, QuotesServiceError> {
        let quote = self.quotes.get_quote(tx, quote).await?;

        if !quote.status.is_editable() {
            return Err(QuotesServiceError::InvalidStatusTransition);
        }

        Ok(quote)
    }
}

fn current_year() -> i32 {
    i32::from(jiff::Timestamp::now().to_zoned(TimeZone::UTC).year())
}

#[async_trait]
impl QuotesService for PgQuotesService {
    #[tracing::instrument(
        name = "quotes.service.create_quote",
        skip(self, quote),
        fields(
            tenant_uuid = %tenant,
            quote_uuid = %quote.uuid,
            requested_items = quote.items.len(),
            quote_number = tracing::field::Empty,
        ),
        err
    )]
    async fn create_quote(
        &self,
        tenant: TenantUuid,
        quote: NewQuote,
    ) -> Result<QuoteRecord, QuotesServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let customer = self
            .customers
            .find_customer(&mut tx, quote.customer_uuid)
            .await?
            .ok_or(QuotesServiceError::CustomerNotFound)?;

        let settings = self.settings.get_or_create_settings(&mut tx).await?;

        let number = self
            .sequences
            .next_document_number(&mut tx, current_year(), &settings.number_prefix)
            .await?;

        tracing::Span::current().record("quote_number", tracing::field::display(&number.formatted));

        self.quotes
            .create_quote(&mut tx, quote.uuid, customer.uuid, &number.formatted)
            .await?;

        let mut written = 0_usize;

        for item in &quote.items {
            let Some(snapshot) = self.snapshot_item(&mut tx, item).await? else {
                continue;
            };

            self.items.create_item(&mut tx, quote.uuid, snapshot).await?;

            written += 1;
        }

        if written == 0 {
            return Err(QuotesServiceError::NoValidItems);
        }

        self.recompute_totals(&mut tx, quote.uuid).await?;

        let mut created = self.quotes.get_quote(&mut tx, quote.uuid).await?;
        let items = self.items.list_items(&mut tx, quote.uuid).await?;

        tx.commit().await?;

        created.items.extend(items);

        info!(quote_uuid = %created.uuid, quote_number = %created.quote_number, "created quote");

        Ok(created)
    }

    async fn get_quote(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
    ) -> Result<QuoteRecord, QuotesServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let mut record = self.quotes.get_quote(&mut tx, quote).await?;
        let items = self.items.list_items(&mut tx, quote).await?;

        tx.commit().await?;

        record.items.extend(items);

        Ok(record)
    }

    #[tracing::instrument(
        name = "quotes.service.add_item",
        skip(self, item),
        fields(tenant_uuid = %tenant, quote_uuid = %quote),
        err
    )]
    async fn add_item(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
        item: NewQuoteItem,
    ) -> Result<QuoteItemRecord, QuotesServiceError> {
        if item.quantity <= 0 {
            return Err(QuotesServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        self.editable_quote(&mut tx, quote).await?;

        // For a single explicit add there is no bulk skip rule: an
        // unresolved catalog reference is a hard error.
        let snapshot = self
            .snapshot_item(&mut tx, &item)
            .await?
            .ok_or(QuotesServiceError::CatalogItemNotFound)?;

        let created = self.items.create_item(&mut tx, quote, snapshot).await?;

        self.recompute_totals(&mut tx, quote).await?;

        tx.commit().await?;

        Ok(created)
    }

    #[tracing::instrument(
        name = "quotes.service.remove_item",
        skip(self),
        fields(tenant_uuid = %tenant, quote_uuid = %quote),
        err
    )]
    async fn remove_item(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
        item: QuoteItemUuid,
    ) -> Result<(), QuotesServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        self.editable_quote(&mut tx, quote).await?;

        let rows_affected = self.items.delete_item(&mut tx, quote, item).await?;

        if rows_affected == 0 {
            return Err(QuotesServiceError::NotFound);
        }

        self.recompute_totals(&mut tx, quote).await?;

        tx.commit().await?;

        Ok(())
    }

    async fn mark_sent(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
    ) -> Result<QuoteRecord, QuotesServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let record = self.quotes.get_quote(&mut tx, quote).await?;

        if !record.status.can_transition(QuoteStatus::Sent) {
            return Err(QuotesServiceError::InvalidStatusTransition);
        }

        self.quotes.set_status(&mut tx, quote, QuoteStatus::Sent).await?;

        let updated = self.quotes.get_quote(&mut tx, quote).await?;

        tx.commit().await?;

        Ok(updated)
    }
}

#[automock]
#[async_trait]
/// Quote aggregate operations.
pub trait QuotesService: Send + Sync {
    /// Create a quote with its line items in a single transaction.
    ///
    /// The document number, the header, every item snapshot and the final
    /// totals all commit together or not at all.
    async fn create_quote(
        &self,
        tenant: TenantUuid,
        quote: NewQuote,
    ) -> Result<QuoteRecord, QuotesServiceError>;

    /// Retrieve a quote with its items.
    async fn get_quote(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
    ) -> Result<QuoteRecord, QuotesServiceError>;

    /// Add one line to a live quote and re-derive the header totals.
    async fn add_item(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
        item: NewQuoteItem,
    ) -> Result<QuoteItemRecord, QuotesServiceError>;

    /// Remove one line from a live quote and re-derive the header totals.
    async fn remove_item(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
        item: QuoteItemUuid,
    ) -> Result<(), QuotesServiceError>;

    /// Transition a draft quote to sent.
    async fn mark_sent(
        &self,
        tenant: TenantUuid,
        quote: QuoteUuid,
    ) -> Result<QuoteRecord, QuotesServiceError>;
}
