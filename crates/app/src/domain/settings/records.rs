//! Tenant Settings Records

use jiff::Timestamp;

use crate::domain::{settings::secrets::SigningSecret, tenants::records::TenantUuid};

/// Per-tenant document and policy settings.
///
/// A row is created with defaults the first time a tenant's settings are
/// read, so callers never observe a missing row.
#[derive(Debug, Clone)]
pub struct TenantSettingsRecord {
    pub tenant_uuid: TenantUuid,

    /// Prefix for generated document numbers, e.g. `Q` in `Q-2025-000001`.
    pub number_prefix: String,

    /// Default tax rate in basis points (1900 = 19.00%).
    pub default_tax_rate_bps: i32,

    /// Receipt retention window in years; verification fails past it.
    pub retention_years: i32,

    /// Lifetime of newly issued consent tokens in days.
    pub consent_validity_days: i32,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One version of a tenant's signing-secret map.
#[derive(Debug, Clone)]
pub struct SigningSecretRecord {
    pub tenant_uuid: TenantUuid,
    pub version: i32,
    pub secret: SigningSecret,
    pub created_at: Timestamp,
}
