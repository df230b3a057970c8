//! Tenant Settings service.

use std::collections::BTreeMap;

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        settings::{
            data::SettingsUpdate,
            errors::SettingsServiceError,
            records::{SigningSecretRecord, TenantSettingsRecord},
            repository::PgSettingsRepository,
            secrets::{SigningSecret, generate_signing_secret},
        },
        tenants::records::TenantUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgSettingsService {
    db: Db,
    repository: PgSettingsRepository,
}

impl PgSettingsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgSettingsRepository::new(),
        }
    }
}

#[async_trait]
impl SettingsService for PgSettingsService {
    async fn get_settings(
        &self,
        tenant: TenantUuid,
    ) -> Result<TenantSettingsRecord, SettingsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let settings = self.repository.get_or_create_settings(&mut tx).await?;

        tx.commit().await?;

        Ok(settings)
    }

    async fn update_settings(
        &self,
        tenant: TenantUuid,
        update: SettingsUpdate,
    ) -> Result<TenantSettingsRecord, SettingsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        self.repository.get_or_create_settings(&mut tx).await?;

        let settings = self.repository.update_settings(&mut tx, update).await?;

        tx.commit().await?;

        Ok(settings)
    }

    #[tracing::instrument(name = "settings.service.rotate_signing_secret", skip(self), fields(tenant_uuid = %tenant), err)]
    async fn rotate_signing_secret(
        &self,
        tenant: TenantUuid,
    ) -> Result<SigningSecretRecord, SettingsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let secret = generate_signing_secret();

        let record = self.repository.create_signing_secret(&mut tx, &secret).await?;

        tx.commit().await?;

        tracing::info!(version = record.version, "rotated signing secret");

        Ok(record)
    }

    async fn signing_secrets(
        &self,
        tenant: TenantUuid,
    ) -> Result<BTreeMap<i32, SigningSecret>, SettingsServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let records = self.repository.list_signing_secrets(&mut tx).await?;

        tx.commit().await?;

        Ok(records
            .into_iter()
            .map(|record| (record.version, record.secret))
            .collect())
    }
}

#[automock]
#[async_trait]
/// Tenant settings collaborator: numbering prefix, tax and retention policy,
/// and the version → secret signing map.
pub trait SettingsService: Send + Sync {
    /// Fetch the tenant's settings, creating the row with defaults when absent.
    async fn get_settings(
        &self,
        tenant: TenantUuid,
    ) -> Result<TenantSettingsRecord, SettingsServiceError>;

    /// Apply a partial settings update.
    async fn update_settings(
        &self,
        tenant: TenantUuid,
        update: SettingsUpdate,
    ) -> Result<TenantSettingsRecord, SettingsServiceError>;

    /// Add the next signing-secret version without invalidating earlier ones.
    async fn rotate_signing_secret(
        &self,
        tenant: TenantUuid,
    ) -> Result<SigningSecretRecord, SettingsServiceError>;

    /// The tenant's full signing-secret map, keyed by version.
    async fn signing_secrets(
        &self,
        tenant: TenantUuid,
    ) -> Result<BTreeMap<i32, SigningSecret>, SettingsServiceError>;
}
