use clap::{Parser, Subcommand};

mod receipt;
mod secret;
mod tenant;

#[derive(Debug, Parser)]
#[command(name = "quill-app", about = "Quill CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Tenant(tenant::TenantCommand),
    Secret(secret::SecretCommand),
    Receipt(receipt::ReceiptCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Tenant(command) => tenant::run(command).await,
            Commands::Secret(command) => secret::run(command).await,
            Commands::Receipt(command) => receipt::run(command).await,
        }
    }
}
