use doorkeeper_core::UserId;
use thiserror::Error;

/// Storage-specific error types for the door access store.
///
/// Connection-level sqlx failures are reported as [`StorageError::Unavailable`]
/// so callers can rebuild the pool and retry.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Query execution failed
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Entity not found in database
    #[error("Entity not found: {entity_type} with {field}={value}")]
    NotFound {
        entity_type: String,
        field: String,
        value: String,
    },

    /// Key UID already bound to a user
    #[error("Key {key_uid} is already assigned to user {owner}")]
    Conflict { key_uid: String, owner: UserId },

    /// Input rejected before any write
    #[error("Validation error: {0}")]
    Validation(String),

    /// The database cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Password hashing or verification failed
    #[error("Hashing error: {0}")]
    Hashing(String),
}

impl StorageError {
    pub fn not_found(
        entity_type: impl Into<String>,
        field: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns `true` if the pool should be rebuilt before the next operation.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Unavailable(error.to_string()),
            other => Self::Database(other),
        }
    }
}

impl From<doorkeeper_core::Error> for StorageError {
    fn from(error: doorkeeper_core::Error) -> Self {
        Self::Validation(error.to_string())
    }
}

/// Returns `true` if `error` is a UNIQUE or PRIMARY KEY violation.
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
