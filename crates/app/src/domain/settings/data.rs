//! Tenant Settings Data

/// Partial settings update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub number_prefix: Option<String>,
    pub default_tax_rate_bps: Option<i32>,
    pub retention_years: Option<i32>,
    pub consent_validity_days: Option<i32>,
}
