//! Door controller daemon.
//!
//! Polls the NFC reader, unlocks for active members and writes every
//! access attempt to the audit log until SIGINT or SIGTERM.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use doorkeeper_cli::{Config, logging, shutdown::shutdown_signal};
use doorkeeper_engine::AccessEngine;
use doorkeeper_hardware::AnyDoorHardware;
use doorkeeper_storage::SqliteCredentialStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "door-lock", version, about = "NFC door access controller")]
struct Cli {
    /// Configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "door-lock exiting with error");
            eprintln!("door-lock: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load_or_default(&path)?;
    logging::init(&config.logging, false);

    info!(config = %path.display(), "door-lock starting");

    let store = SqliteCredentialStore::open(config.database.clone())
        .await
        .with_context(|| format!("Failed to open database {}", config.database.database_path))?;
    let hardware = AnyDoorHardware::from_config(&config.hardware)
        .await
        .context("Failed to initialize door hardware")?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let mut engine = AccessEngine::new(hardware, store, config.engine.clone());
    engine.run(shutdown).await.context("Access engine failed")?;

    let (_, store) = engine.into_parts();
    store.database().await.close().await;
    info!("door-lock shut down gracefully");
    Ok(())
}
