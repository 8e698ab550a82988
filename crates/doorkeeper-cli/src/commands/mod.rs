//! `doorctl` subcommands.
//!
//! Each subcommand group is a clap `Subcommand` enum with an `execute`
//! method that runs against an [`Admin`] context.

pub mod auth;
pub mod group;
pub mod key;
pub mod log;
pub mod tag;
pub mod user;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use doorkeeper_core::UserId;
use doorkeeper_storage::{
    Database, Group, GroupRepository, SqliteAccessLogRepository, SqliteAuthorizationQuery,
    SqliteCredentialStore, SqliteGroupRepository, SqliteKeyRepository, SqliteTagRepository,
    SqliteUserRepository, StorageError, User, UserRepository,
};

use crate::output::OutputFormat;

pub use auth::AuthCommand;
pub use group::GroupCommand;
pub use key::KeyCommand;
pub use log::LogCommand;
pub use tag::TagCommand;
pub use user::UserCommand;

/// Top-level `doorctl` subcommands.
#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Manage members
    #[command(subcommand)]
    User(UserCommand),
    /// Bind and unbind NFC keys
    #[command(subcommand)]
    Key(KeyCommand),
    /// Manage groups, their tags and members
    #[command(subcommand)]
    Group(GroupCommand),
    /// Manage authorization tags
    #[command(subcommand)]
    Tag(TagCommand),
    /// Check authorizations
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Read and write the access log
    #[command(subcommand)]
    Log(LogCommand),
}

impl AdminCommand {
    pub async fn execute(&self, admin: &Admin) -> Result<()> {
        match self {
            Self::User(cmd) => cmd.execute(admin).await,
            Self::Key(cmd) => cmd.execute(admin).await,
            Self::Group(cmd) => cmd.execute(admin).await,
            Self::Tag(cmd) => cmd.execute(admin).await,
            Self::Auth(cmd) => cmd.execute(admin).await,
            Self::Log(cmd) => cmd.execute(admin).await,
        }
    }
}

/// Database handle plus output format shared by every subcommand.
pub struct Admin {
    db: Database,
    format: OutputFormat,
}

impl Admin {
    pub fn new(db: Database, format: OutputFormat) -> Self {
        Self { db, format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn users(&self) -> SqliteUserRepository {
        SqliteUserRepository::new(self.db.pool().clone())
    }

    pub fn keys(&self) -> SqliteKeyRepository {
        SqliteKeyRepository::new(self.db.pool().clone())
    }

    pub fn groups(&self) -> SqliteGroupRepository {
        SqliteGroupRepository::new(self.db.pool().clone())
    }

    pub fn tags(&self) -> SqliteTagRepository {
        SqliteTagRepository::new(self.db.pool().clone())
    }

    pub fn logs(&self) -> SqliteAccessLogRepository {
        SqliteAccessLogRepository::new(self.db.pool().clone())
    }

    pub fn authorization(&self) -> SqliteAuthorizationQuery {
        SqliteAuthorizationQuery::new(self.db.pool().clone())
    }

    /// A credential store sharing this pool, for the enrollment transaction.
    pub fn store(&self) -> SqliteCredentialStore {
        SqliteCredentialStore::from_database(self.db.clone())
    }

    /// Find a user by numeric id or email.
    pub async fn find_user(&self, user: &str) -> Result<User> {
        let users = self.users();
        let found = match user.trim().parse::<UserId>() {
            Ok(id) => users.find_by_id(id).await?,
            Err(_) => users.find_by_email(user.trim()).await?,
        };
        found.ok_or_else(|| StorageError::not_found("User", "id or email", user).into())
    }

    /// Find a group by name.
    pub async fn find_group(&self, name: &str) -> Result<Group> {
        self.groups()
            .find_by_name(name)
            .await?
            .ok_or_else(|| StorageError::not_found("Group", "name", name).into())
    }
}

/// Exit status for a failed `doorctl` command: 2 for a key conflict, 3 for a
/// missing record, 1 otherwise.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<StorageError>() {
        Some(e) if e.is_conflict() => 2,
        Some(e) if e.is_not_found() => 3,
        _ => 1,
    }
}

/// Split `field=value`.
pub(crate) fn parse_assignment(raw: &str) -> Result<(&str, &str)> {
    let Some((field, value)) = raw.split_once('=') else {
        bail!("expected FIELD=VALUE, got '{raw}'");
    };
    let field = field.trim();
    if field.is_empty() {
        bail!("missing field name in '{raw}'");
    }
    Ok((field, value.trim()))
}

/// Parse a `YYYY-MM-DD` date argument.
pub(crate) fn parse_date(raw: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}
