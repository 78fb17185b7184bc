//! recordvault - backup, retention and restore for structured records
//!
//! Main binary entry point for the command-line interface.

use clap::Parser;
use recordvault::cli::{Cli, Commands};
use recordvault::logging::init_logging;
use recordvault::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Backup(args) => {
            let args = args.clone();
            recordvault::cli::backup::run(&cli, args).await
        }
        Commands::Restore(args) => {
            let args = args.clone();
            recordvault::cli::restore::run(&cli, args).await
        }
        Commands::Retention(args) => {
            let args = args.clone();
            recordvault::cli::retention::run(&cli, args).await
        }
        Commands::Export(args) => {
            let args = args.clone();
            recordvault::cli::export::run(&cli, args).await
        }
        Commands::Policies(args) => {
            let args = args.clone();
            recordvault::cli::policies::run(&cli, args).await
        }
    }
}
