//! Hostvar - Host-scoped placeholder variables
//!
//! Command-line entry point. Opens the file-backed store and runs one
//! command against it.

mod cli;
mod commands;
mod error;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use hostvar_application::VariableStore;
use hostvar_infrastructure::{AppConfig, FileKeyValueStore, SystemClock, UuidIdGenerator};
use tracing::debug;

use cli::Cli;
use error::AppResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(path) = cli.data {
        config = config.with_data_path(path);
    }
    debug!(path = %config.data_path.display(), "Opening storage");

    let backend = FileKeyValueStore::with_quota(&config.data_path, config.quota_bytes);
    let store = VariableStore::open(
        Arc::new(backend),
        Arc::new(SystemClock::new()),
        Arc::new(UuidIdGenerator::new()),
        config.store_config(),
    )
    .await?;

    let mut stdout = std::io::stdout().lock();
    commands::execute(cli.command, Arc::new(store), &config.data_path, &mut stdout).await
}
