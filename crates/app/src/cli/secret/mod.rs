use clap::{Args, Subcommand};

mod rotate;

#[derive(Debug, Args)]
pub(crate) struct SecretCommand {
    #[command(subcommand)]
    command: SecretSubcommand,
}

#[derive(Debug, Subcommand)]
enum SecretSubcommand {
    Rotate(rotate::RotateSecretArgs),
}

pub(crate) async fn run(command: SecretCommand) -> Result<(), String> {
    match command.command {
        SecretSubcommand::Rotate(args) => rotate::run(args).await,
    }
}
