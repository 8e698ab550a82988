//! Bind an NFC key to a member and activate them.
//!
//! Exit statuses: 0 enrolled, 1 other error, 2 key already assigned,
//! 3 user not found, 4 no key read, 5 not running as root.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use doorkeeper_cli::enroll::{EXIT_ENROLLED, EnrollError, Enrollment, KeySource, running_as_root};
use doorkeeper_cli::prompt::Prompt;
use doorkeeper_cli::{Config, logging};
use doorkeeper_hardware::AnyDoorHardware;
use doorkeeper_storage::SqliteCredentialStore;
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "enroll", version, about = "Enroll an NFC key for a member")]
#[command(group(ArgGroup::new("method").args(["nfcid", "reader"])))]
struct Cli {
    /// User id or email
    #[arg(short, long)]
    user: Option<String>,

    /// UID of the member's key
    #[arg(short, long)]
    nfcid: Option<String>,

    /// Read the key UID from the card reader
    #[arg(short, long)]
    reader: bool,

    /// Reassign the key if it is already registered to another member
    #[arg(short, long)]
    steal: bool,

    /// Suppress prompts and output
    #[arg(short, long)]
    quiet: bool,

    /// Configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::from(EXIT_ENROLLED),
        Err(e) => {
            error!(error = %e, "enrollment failed");
            if !cli.quiet || matches!(e, EnrollError::NotRoot) {
                eprintln!("enroll: {e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: &Cli) -> Result<(), EnrollError> {
    if !running_as_root() {
        return Err(EnrollError::NotRoot);
    }

    let path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load_or_default(&path)?;
    logging::init(&config.logging, cli.quiet);

    let store = SqliteCredentialStore::open(config.database.clone())
        .await
        .with_context(|| format!("Failed to open database {}", config.database.database_path))?;

    let source = match (&cli.nfcid, cli.reader) {
        (Some(uid), _) => KeySource::Given(uid.clone()),
        (None, true) => KeySource::Reader,
        (None, false) => KeySource::Prompt,
    };

    let mut hardware = match source {
        KeySource::Reader => Some(
            AnyDoorHardware::from_config(&config.hardware)
                .await
                .context("Failed to initialize the card reader")?,
        ),
        _ => None,
    };

    let mut enrollment = Enrollment::new(&store, Prompt::stdio())
        .quiet(cli.quiet)
        .steal(cli.steal);

    let user = enrollment.user(cli.user.as_deref()).await?;
    let uid = enrollment
        .key(source, hardware.as_mut(), config.engine.read_budget())
        .await?;
    enrollment.bind(&uid, &user).await?;

    store.database().await.close().await;
    Ok(())
}
