use anyhow::Result;
use clap::Subcommand;
use doorkeeper_core::{CardUid, LogKind};
use doorkeeper_storage::{AccessLogRepository, LogFilter, NewLogEntry};
use tracing::info;

use super::Admin;
use crate::output::{print_records, print_success};

#[derive(Debug, Subcommand)]
pub enum LogCommand {
    /// Show log entries, newest first
    List {
        #[arg(long)]
        kind: Option<LogKind>,
        /// User id or email
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        key: Option<CardUid>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Append a log entry
    Add {
        #[arg(long)]
        kind: LogKind,
        #[arg(long)]
        message: String,
        /// User id or email
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        key: Option<CardUid>,
    },
}

impl LogCommand {
    pub async fn execute(&self, admin: &Admin) -> Result<()> {
        let logs = admin.logs();
        match self {
            Self::List {
                kind,
                user,
                key,
                limit,
            } => {
                let user_id = match user {
                    Some(user) => Some(admin.find_user(user).await?.id),
                    None => None,
                };
                let filter = LogFilter {
                    kind: *kind,
                    user_id,
                    key_uid: key.clone(),
                };
                print_records(admin.format(), &logs.find(&filter, *limit).await?)?;
            }
            Self::Add {
                kind,
                message,
                user,
                key,
            } => {
                let mut entry = NewLogEntry::new(*kind).with_message(message.as_str());
                if let Some(user) = user {
                    entry = entry.with_user(admin.find_user(user).await?.id);
                }
                if let Some(key) = key {
                    entry = entry.with_key(key.clone());
                }
                let id = logs.append(&entry).await?;
                info!(log_id = id, %kind, "log entry added");
                print_success(admin.format(), &format!("Logged entry {id}"));
            }
        }
        Ok(())
    }
}
