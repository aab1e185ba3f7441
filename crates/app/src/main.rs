//! Courier - command-line entry point
//!
//! Loads drafts, environments and settings from JSON files, sends them
//! through the dispatcher and prints the exchange records.

mod cli;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();
    match cli.command {
        cli::Command::Send(args) => cli::send(args).await,
    }
}
