//! Storage layer for the door access controller.
//!
//! SQLite-backed persistence for users, NFC key bindings, groups,
//! authorization tags and the append-only access log.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool manager with embedded migrations
//! - [`CredentialStore`] - What the access engine and enrollment need:
//!   key and user resolution, log appends, atomic key enrollment
//! - Repository traits ([`UserRepository`], [`KeyRepository`],
//!   [`GroupRepository`], [`TagRepository`], [`AccessLogRepository`]) for the
//!   administrative surface
//! - [`AuthorizationQuery`] - "is this user allowed through this tag" joins
//! - [`search`] - the member search query language
//! - [`transaction`] - helpers that run inside a caller-owned transaction
//!
//! # Example
//!
//! ```no_run
//! use doorkeeper_storage::{CredentialStore, DatabaseConfig, SqliteCredentialStore};
//! use doorkeeper_core::CardUid;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteCredentialStore::open(DatabaseConfig::new("doorkeeper.db")).await?;
//!
//! let uid = CardUid::parse("04:a1:b2:c3")?;
//! match store.resolve_by_key_id(&uid).await? {
//!     Some(user) if user.is_active() => println!("welcome {}", user.full_name()),
//!     Some(user) => println!("{} is not active", user.email),
//!     None => println!("unknown key"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! All statements use bound parameters. The only dynamically assembled SQL
//! (user updates and search) draws its column names and clauses from closed
//! enumerations.

pub mod authorization;
pub mod connection;
pub mod error;
pub mod models;
pub mod password;
pub mod repositories;
pub mod search;
pub mod store;
pub mod transaction;

pub use authorization::{AuthorizationQuery, SqliteAuthorizationQuery};
pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::{
    AccessLogEntry, Group, KeyBinding, NewLogEntry, NewUser, Tag, User, UserField, UserUpdate,
};
pub use repositories::{
    AccessLogRepository, GroupRepository, KeyRepository, LogFilter, SqliteAccessLogRepository,
    SqliteGroupRepository, SqliteKeyRepository, SqliteTagRepository, SqliteUserRepository,
    TagRepository, UserRepository,
};
pub use search::{SearchTerm, parse_query};
pub use store::{CredentialStore, SqliteCredentialStore};
