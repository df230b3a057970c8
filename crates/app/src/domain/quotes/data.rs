//! Quote Data

use crate::domain::{
    catalog::records::CatalogItemUuid,
    customers::records::CustomerUuid,
    quotes::records::{QuoteItemUuid, QuoteUuid},
};

/// New Quote Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuote {
    pub uuid: QuoteUuid,
    pub customer_uuid: CustomerUuid,
    pub items: Vec<NewQuoteItem>,
}

/// New Quote Item Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuoteItem {
    pub uuid: QuoteItemUuid,
    pub catalog_item_uuid: CatalogItemUuid,

    /// Fixed-point quantity with four fractional digits (15_000 = 1.5).
    pub quantity: i64,
}

/// Fully derived item row, ready for insertion.
///
/// Produced by the service from a [`NewQuoteItem`] plus the catalog snapshot
/// taken inside the creating transaction.
#[derive(Debug, Clone)]
pub(crate) struct QuoteItemSnapshot {
    pub(crate) uuid: QuoteItemUuid,
    pub(crate) catalog_item_uuid: CatalogItemUuid,
    pub(crate) description: String,
    pub(crate) unit: String,
    pub(crate) quantity: i64,
    pub(crate) unit_price: u64,
    pub(crate) tax_rate_bps: i32,
    pub(crate) line_subtotal: u64,
    pub(crate) line_tax: u64,
    pub(crate) line_total: u64,
}
