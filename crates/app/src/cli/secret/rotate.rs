use clap::Args;
use quill_app::{
    database::{self, Db},
    domain::{
        settings::{PgSettingsService, SettingsService},
        tenants::records::TenantUuid,
    },
};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct RotateSecretArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Tenant whose signing-secret map gains the next version
    #[arg(long)]
    tenant_uuid: Uuid,
}

pub(crate) async fn run(args: RotateSecretArgs) -> Result<(), String> {
    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let settings = PgSettingsService::new(Db::new(pool));

    let record = settings
        .rotate_signing_secret(TenantUuid::from_uuid(args.tenant_uuid))
        .await
        .map_err(|error| format!("failed to rotate signing secret: {error}"))?;

    // Earlier versions stay configured; receipts signed under them keep
    // verifying. The secret material itself never leaves the database.
    println!("tenant_uuid: {}", record.tenant_uuid);
    println!("signing_secret_version: {}", record.version);

    Ok(())
}
