use clap::{Args, Subcommand};

mod verify;

#[derive(Debug, Args)]
pub(crate) struct ReceiptCommand {
    #[command(subcommand)]
    command: ReceiptSubcommand,
}

#[derive(Debug, Subcommand)]
enum ReceiptSubcommand {
    Verify(verify::VerifyReceiptArgs),
}

pub(crate) async fn run(command: ReceiptCommand) -> Result<(), String> {
    match command.command {
        ReceiptSubcommand::Verify(args) => verify::run(args).await,
    }
}
