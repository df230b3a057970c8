//! Catalog

pub mod data;
pub mod errors;
pub mod records;
mod repositories;
pub mod service;
pub mod tree;

pub(crate) use repositories::{PgCatalogItemsRepository, PgCategoriesRepository};

pub use errors::CatalogServiceError;
pub use service::*;
