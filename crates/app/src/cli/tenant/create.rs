use clap::Args;
use quill_app::{
    database::{self, Db},
    domain::{
        settings::{PgSettingsService, SettingsService},
        tenants::{PgTenantsService, TenantsService, data::NewTenant, records::TenantUuid},
    },
};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct CreateTenantArgs {
    /// Tenant display name
    #[arg(long)]
    name: String,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Optional tenant UUID; generated when omitted
    #[arg(long)]
    tenant_uuid: Option<Uuid>,
}

pub(crate) async fn run(args: CreateTenantArgs) -> Result<(), String> {
    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let tenants = PgTenantsService::new(pool.clone());
    let settings = PgSettingsService::new(Db::new(pool));

    let tenant_uuid = args
        .tenant_uuid
        .map_or_else(TenantUuid::new, TenantUuid::from_uuid);

    let tenant = tenants
        .create_tenant(NewTenant {
            uuid: tenant_uuid,
            name: args.name,
        })
        .await
        .map_err(|error| format!("failed to create tenant: {error}"))?;

    // Provision defaults plus the first signing secret so documents can be
    // numbered and receipts signed right away.
    let tenant_settings = settings
        .get_settings(tenant.uuid)
        .await
        .map_err(|error| format!("failed to provision settings: {error}"))?;

    let secret = settings
        .rotate_signing_secret(tenant.uuid)
        .await
        .map_err(|error| format!("failed to provision signing secret: {error}"))?;

    println!("tenant_uuid: {}", tenant.uuid);
    println!("tenant_name: {}", tenant.name);
    println!("number_prefix: {}", tenant_settings.number_prefix);
    println!("signing_secret_version: {}", secret.version);

    Ok(())
}
