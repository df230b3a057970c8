//! Tenant Settings Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::domain::settings::{
    data::SettingsUpdate,
    records::{SigningSecretRecord, TenantSettingsRecord},
    secrets::SigningSecret,
};
use crate::domain::tenants::records::TenantUuid;

const GET_OR_CREATE_SETTINGS_SQL: &str = include_str!("sql/get_or_create_settings.sql");
const UPDATE_SETTINGS_SQL: &str = include_str!("sql/update_settings.sql");
const CREATE_SIGNING_SECRET_SQL: &str = include_str!("sql/create_signing_secret.sql");
const LIST_SIGNING_SECRETS_SQL: &str = include_str!("sql/list_signing_secrets.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgSettingsRepository;

impl PgSettingsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Fetch the tenant's settings row, creating it with defaults on first use.
    pub(crate) async fn get_or_create_settings(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<TenantSettingsRecord, sqlx::Error> {
        query_as::<Postgres, TenantSettingsRecord>(GET_OR_CREATE_SETTINGS_SQL)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_settings(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        update: SettingsUpdate,
    ) -> Result<TenantSettingsRecord, sqlx::Error> {
        query_as::<Postgres, TenantSettingsRecord>(UPDATE_SETTINGS_SQL)
            .bind(update.number_prefix)
            .bind(update.default_tax_rate_bps)
            .bind(update.retention_years)
            .bind(update.consent_validity_days)
            .fetch_one(&mut **tx)
            .await
    }

    /// Insert the next signing-secret version; prior versions are never touched.
    pub(crate) async fn create_signing_secret(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        secret: &SigningSecret,
    ) -> Result<SigningSecretRecord, sqlx::Error> {
        query_as::<Postgres, SigningSecretRecord>(CREATE_SIGNING_SECRET_SQL)
            .bind(secret.to_hex())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_signing_secrets(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<SigningSecretRecord>, sqlx::Error> {
        query_as::<Postgres, SigningSecretRecord>(LIST_SIGNING_SECRETS_SQL)
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for TenantSettingsRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            tenant_uuid: TenantUuid::from_uuid(row.try_get("tenant_uuid")?),
            number_prefix: row.try_get("number_prefix")?,
            default_tax_rate_bps: row.try_get("default_tax_rate_bps")?,
            retention_years: row.try_get("retention_years")?,
            consent_validity_days: row.try_get("consent_validity_days")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for SigningSecretRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let secret_hex: String = row.try_get("secret")?;

        let secret = SigningSecret::from_hex(&secret_hex).ok_or_else(|| {
            sqlx::Error::ColumnDecode {
                index: "secret".to_string(),
                source: "stored signing secret is not valid hex".into(),
            }
        })?;

        Ok(Self {
            tenant_uuid: TenantUuid::from_uuid(row.try_get("tenant_uuid")?),
            version: row.try_get("version")?,
            secret,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
