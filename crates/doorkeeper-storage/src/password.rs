//! Password hashing for the administrative accounts.
//!
//! bcrypt is CPU-bound, so both operations run on the blocking thread pool.

use crate::error::{StorageError, StorageResult};

/// Default bcrypt cost factor.
pub const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// Hash a password using bcrypt.
///
/// # Errors
/// Returns `StorageError::Validation` for an empty password and
/// `StorageError::Hashing` if bcrypt fails.
pub async fn hash_password(password: &str, cost: u32) -> StorageResult<String> {
    if password.is_empty() {
        return Err(StorageError::validation("password must not be empty"));
    }

    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        bcrypt::hash(password, cost).map_err(|e| StorageError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| StorageError::Hashing(format!("Task join error: {}", e)))?
}

/// Verify a password against a stored hash.
///
/// A missing or empty hash never verifies.
///
/// # Errors
/// Returns `StorageError::Hashing` if the stored hash is malformed.
pub async fn verify_password(password: &str, hash: Option<&str>) -> StorageResult<bool> {
    let Some(hash) = hash.filter(|h| !h.is_empty()) else {
        return Ok(false);
    };

    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || {
        bcrypt::verify(password, &hash).map_err(|e| StorageError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| StorageError::Hashing(format!("Task join error: {}", e)))?
}
