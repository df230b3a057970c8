//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    database::{self, Db},
    domain::{
        catalog::{CatalogService, PgCatalogService},
        consent::{ConsentService, PgConsentService},
        customers::{CustomersService, PgCustomersService},
        quotes::{PgQuotesService, QuotesService},
        receipts::{PgReceiptsService, ReceiptsService},
        settings::{PgSettingsService, SettingsService},
        tenants::{PgTenantsService, TenantsService},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

/// Service wiring for one process.
///
/// Every service receives the same request-scoped [`Db`] handle; nothing in
/// the domain reaches for a global connection.
#[derive(Clone)]
pub struct AppContext {
    pub tenants: Arc<dyn TenantsService>,
    pub settings: Arc<dyn SettingsService>,
    pub customers: Arc<dyn CustomersService>,
    pub catalog: Arc<dyn CatalogService>,
    pub quotes: Arc<dyn QuotesService>,
    pub consent: Arc<dyn ConsentService>,
    pub receipts: Arc<dyn ReceiptsService>,
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_database_url(url: &str) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        let db = Db::new(pool.clone());

        Ok(Self {
            tenants: Arc::new(PgTenantsService::new(pool)),
            settings: Arc::new(PgSettingsService::new(db.clone())),
            customers: Arc::new(PgCustomersService::new(db.clone())),
            catalog: Arc::new(PgCatalogService::new(db.clone())),
            quotes: Arc::new(PgQuotesService::new(db.clone())),
            consent: Arc::new(PgConsentService::new(db.clone())),
            receipts: Arc::new(PgReceiptsService::new(db)),
        })
    }
}
