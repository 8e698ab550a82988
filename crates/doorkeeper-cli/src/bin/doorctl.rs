//! Administration of members, keys, groups, tags and the access log.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use doorkeeper_cli::commands::{Admin, AdminCommand, exit_code};
use doorkeeper_cli::output::print_error;
use doorkeeper_cli::{Config, OutputFormat, logging};
use doorkeeper_storage::Database;

#[derive(Debug, Parser)]
#[command(name = "doorctl", version, about = "Door access administration")]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: AdminCommand,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = OutputFormat::from_json_flag(cli.json);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(format, &format!("{e:#}"));
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load_or_default(&path)?;
    logging::init(&config.logging, cli.quiet);

    let db = Database::new(&config.database)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.database_path))?;
    let admin = Admin::new(db.clone(), OutputFormat::from_json_flag(cli.json));

    let result = cli.command.execute(&admin).await;
    db.close().await;
    result
}
