use clap::Args;
use quill_app::{
    database::{self, Db},
    domain::{
        receipts::{PgReceiptsService, ReceiptsService, records::VerificationOutcome},
        tenants::records::TenantUuid,
    },
};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct VerifyReceiptArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Tenant that issued the receipt
    #[arg(long)]
    tenant_uuid: Uuid,

    /// Receipt serial, e.g. Q-2025-000002
    #[arg(long)]
    serial: String,

    /// Verification token from the document or QR payload
    #[arg(long)]
    token: String,
}

pub(crate) async fn run(args: VerifyReceiptArgs) -> Result<(), String> {
    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let receipts = PgReceiptsService::new(Db::new(pool));

    let outcome = receipts
        .verify(
            TenantUuid::from_uuid(args.tenant_uuid),
            &args.serial,
            &args.token,
            "cli",
        )
        .await
        .map_err(|error| format!("failed to verify receipt: {error}"))?;

    println!("outcome: {}", outcome.code());

    match outcome {
        VerificationOutcome::Valid(receipt) => {
            println!("serial: {}", receipt.serial);
            println!("amount_minor_units: {}", receipt.amount);
            println!("issue_date: {}", receipt.issue_date);
            println!("hash_short: {}", receipt.hash_short);
        }
        outcome if outcome.is_configuration_failure() => {
            println!("note: signing configuration problem; this is not a forged code");
        }
        _ => {}
    }

    Ok(())
}
