//! Catalog Data

use crate::domain::catalog::records::{CatalogItemUuid, CategoryUuid};

/// New Catalog Item Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogItem {
    pub uuid: CatalogItemUuid,
    pub category_uuid: Option<CategoryUuid>,
    pub name: String,
    pub unit: String,
    pub unit_price: u64,
    pub tax_rate_bps: i32,
}

/// New Category Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub uuid: CategoryUuid,
    pub name: String,
    pub parent_uuid: Option<CategoryUuid>,
}
