use chrono::{DateTime, TimeZone, Utc};
use doorkeeper_core::{CardUid, LogKind, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{StorageError, StorageResult};

/// One row of the append-only audit log.
///
/// Entries are written for every access attempt (`unlock` or `deny`), for
/// enrollment (`assign`, `activate`) and for free-form `message`/`error`
/// records. They are never updated.
///
/// # Examples
///
/// ```
/// use doorkeeper_storage::models::NewLogEntry;
/// use doorkeeper_core::{CardUid, LogKind};
///
/// let uid = CardUid::parse("04a1b2c3").unwrap();
/// let entry = NewLogEntry::new(LogKind::Deny)
///     .with_key(uid)
///     .with_message("card not registered");
///
/// assert_eq!(entry.kind, LogKind::Deny);
/// assert!(entry.user_id.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub id: i64,
    /// Unix seconds.
    pub timestamp: i64,
    pub kind: LogKind,
    pub key_uid: Option<CardUid>,
    pub user_id: Option<UserId>,
    pub message: Option<String>,
}

impl AccessLogEntry {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }
}

impl fmt::Display for AccessLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let time = self
            .time()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.timestamp.to_string());
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.id,
            time,
            self.kind,
            self.key_uid.as_ref().map(CardUid::as_str).unwrap_or("-"),
            self.user_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            self.message.as_deref().unwrap_or("")
        )
    }
}

/// Raw row as stored; converted into [`AccessLogEntry`] after validation.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AccessLogRow {
    pub id: i64,
    pub timestamp: i64,
    pub kind: String,
    pub key_uid: Option<String>,
    pub user_id: Option<i64>,
    pub message: Option<String>,
}

impl TryFrom<AccessLogRow> for AccessLogEntry {
    type Error = StorageError;

    fn try_from(row: AccessLogRow) -> StorageResult<Self> {
        Ok(Self {
            id: row.id,
            timestamp: row.timestamp,
            kind: row.kind.parse()?,
            key_uid: row.key_uid.as_deref().map(CardUid::parse).transpose()?,
            user_id: row.user_id,
            message: row.message,
        })
    }
}

/// A log entry to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub kind: LogKind,
    pub key_uid: Option<CardUid>,
    pub user_id: Option<UserId>,
    pub message: Option<String>,
    /// Unix seconds; the current time when unset.
    pub timestamp: Option<i64>,
}

impl NewLogEntry {
    pub fn new(kind: LogKind) -> Self {
        Self {
            kind,
            key_uid: None,
            user_id: None,
            message: None,
            timestamp: None,
        }
    }

    /// Build an entry from a textual kind, as typed on the command line.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Validation` for kinds outside the closed set.
    pub fn parse_kind(kind: &str) -> StorageResult<Self> {
        Ok(Self::new(kind.parse::<LogKind>()?))
    }

    pub fn with_key(mut self, uid: CardUid) -> Self {
        self.key_uid = Some(uid);
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub(crate) fn timestamp_or_now(&self) -> i64 {
        self.timestamp.unwrap_or_else(|| Utc::now().timestamp())
    }
}
