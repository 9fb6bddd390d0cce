//! Coalwire CLI — coal-market news pipeline.
//!
//! Discovers candidate news items, selects and publishes the best one to
//! the messaging channel and document store, and reconciles the static
//! site from the document store.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
