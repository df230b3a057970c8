//! Catalog Records

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Catalog Item UUID
pub type CatalogItemUuid = TypedUuid<CatalogItemRecord>;

/// Catalog Item Record
#[derive(Debug, Clone)]
pub struct CatalogItemRecord {
    pub uuid: CatalogItemUuid,
    pub category_uuid: Option<CategoryUuid>,
    pub name: String,

    /// Billing unit, e.g. `piece` or `hour`.
    pub unit: String,

    /// Price per unit in minor currency units.
    pub unit_price: u64,

    /// Tax rate in basis points (1900 = 19.00%).
    pub tax_rate_bps: i32,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// Read-only pricing snapshot consumed at quote-item creation time.
///
/// Copied onto the quote item row so later catalog changes never alter
/// historical documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSnapshot {
    pub description: String,
    pub unit: String,
    pub unit_price: u64,
    pub tax_rate_bps: i32,
}

/// Category UUID
pub type CategoryUuid = TypedUuid<CategoryRecord>;

/// Category Record
#[derive(Debug, Clone)]
pub struct CategoryRecord {
    pub uuid: CategoryUuid,
    pub name: String,
    pub parent_uuid: Option<CategoryUuid>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}
