use chrono::{DateTime, Utc};
use doorkeeper_core::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ownership of one NFC key.
///
/// `key_uid` is the primary key of `key_bindings`, so a UID belongs to at
/// most one user. Stored in the canonical lowercase-hex form of
/// [`CardUid`](doorkeeper_core::CardUid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct KeyBinding {
    pub key_uid: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}",
            self.key_uid,
            self.user_id,
            self.created_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
