mod answers;
mod capabilities;
mod cli;
mod config;
mod diff;
mod error;
mod schema;
mod types;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use answers::AnswerStore;
use capabilities::create_default_registry;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only JSON output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = cli::load_config(cli.config.as_deref())?;
    let answers = Arc::new(AnswerStore::new());
    let registry = create_default_registry(&config, answers)?;
    info!(
        capabilities = registry.len(),
        provider = %config.schema.provider,
        "Registry ready"
    );

    if cli::run(cli.command, &config, &registry).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
