//! Catalog Repositories

mod categories;
mod items;

pub(crate) use categories::PgCategoriesRepository;
pub(crate) use items::PgCatalogItemsRepository;
