//! ## nosa-cli
//! **`nosa` entrypoint**
//!
//! Loads configuration, initializes logging and serves the capture engine
//! over HTTP until interrupted.

use clap::Parser;

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::serve(args).await,
        Commands::Interfaces => commands::interfaces(),
    }
}
