use chrono::{DateTime, NaiveDate, Utc};
use doorkeeper_core::{CardUid, UserId, UserStatus, constants::STATUS_ACTIVE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{StorageError, StorageResult};

/// A member who may hold NFC keys.
///
/// # Fields
///
/// * `id` - Auto-increment primary key
/// * `email` - Unique, compared case-insensitively
/// * `first_name`, `last_name` - Display name
/// * `password_hash` - bcrypt hash for the admin surfaces, never serialized
/// * `status` - One of the values in `user_statuses`; only `active` unlocks
/// * `join_date` - Optional membership start
/// * `key_uids` - Bound key UIDs, loaded by the repository
/// * `groups` - Names of the groups the user belongs to, loaded by the repository
///
/// # Examples
///
/// ```
/// use doorkeeper_storage::models::User;
/// use chrono::Utc;
///
/// let user = User {
///     id: 1,
///     email: "ada@example.org".to_string(),
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     password_hash: None,
///     status: "active".to_string(),
///     join_date: None,
///     created_at: Utc::now(),
///     updated_at: Utc::now(),
///     key_uids: Vec::new(),
///     groups: Vec::new(),
/// };
///
/// assert!(user.is_active());
/// assert_eq!(user.full_name(), "Ada Lovelace");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    #[serde(skip)]
    pub password_hash: Option<String>,

    pub status: String,
    pub join_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[sqlx(skip)]
    #[serde(default)]
    pub key_uids: Vec<CardUid>,

    #[sqlx(skip)]
    #[serde(default)]
    pub groups: Vec<String>,
}

impl User {
    /// Returns `true` if the user's status grants access.
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.id,
            self.full_name(),
            self.email,
            self.status
        )
    }
}

/// Fields for creating a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Defaults to `inactive` until a key is enrolled.
    pub status: Option<UserStatus>,
    pub join_date: Option<NaiveDate>,
    /// Plaintext password, hashed before it is stored.
    pub password: Option<String>,
}

impl NewUser {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_join_date(mut self, date: NaiveDate) -> Self {
        self.join_date = Some(date);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub(crate) fn validate(&self) -> StorageResult<()> {
        validate_email(&self.email)
    }
}

pub(crate) fn validate_email(email: &str) -> StorageResult<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(StorageError::validation(format!(
            "'{email}' is not a valid email address"
        )));
    }
    Ok(())
}

/// The user columns an administrator may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Email,
    FirstName,
    LastName,
    JoinDate,
    Status,
}

impl UserField {
    pub const ALL: [UserField; 5] = [
        UserField::Email,
        UserField::FirstName,
        UserField::LastName,
        UserField::JoinDate,
        UserField::Status,
    ];

    /// Column name in the `users` table.
    pub fn column(self) -> &'static str {
        match self {
            UserField::Email => "email",
            UserField::FirstName => "first_name",
            UserField::LastName => "last_name",
            UserField::JoinDate => "join_date",
            UserField::Status => "status",
        }
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for UserField {
    type Err = StorageError;

    fn from_str(s: &str) -> StorageResult<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "email" => Ok(UserField::Email),
            "first_name" | "firstname" => Ok(UserField::FirstName),
            "last_name" | "lastname" => Ok(UserField::LastName),
            "join_date" | "joindate" => Ok(UserField::JoinDate),
            "status" => Ok(UserField::Status),
            other => Err(StorageError::validation(format!(
                "'{other}' is not an updatable user field"
            ))),
        }
    }
}

/// A bound value for one updated column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
}

/// A partial update of a user. Unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub status: Option<UserStatus>,
}

impl UserUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one field from its textual form.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Validation` if the value does not parse for the
    /// field (dates are `YYYY-MM-DD`).
    pub fn set(mut self, field: UserField, value: &str) -> StorageResult<Self> {
        match field {
            UserField::Email => self.email = Some(value.trim().to_string()),
            UserField::FirstName => self.first_name = Some(value.to_string()),
            UserField::LastName => self.last_name = Some(value.to_string()),
            UserField::JoinDate => {
                let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
                    StorageError::validation(format!("invalid join date '{value}': {e}"))
                })?;
                self.join_date = Some(date);
            }
            UserField::Status => self.status = Some(UserStatus::new(value)?),
        }
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    /// The columns to write, in `UserField::ALL` order.
    pub fn assignments(&self) -> Vec<(UserField, FieldValue)> {
        let mut out = Vec::new();
        if let Some(email) = &self.email {
            out.push((UserField::Email, FieldValue::Text(email.clone())));
        }
        if let Some(first_name) = &self.first_name {
            out.push((UserField::FirstName, FieldValue::Text(first_name.clone())));
        }
        if let Some(last_name) = &self.last_name {
            out.push((UserField::LastName, FieldValue::Text(last_name.clone())));
        }
        if let Some(date) = self.join_date {
            out.push((UserField::JoinDate, FieldValue::Date(date)));
        }
        if let Some(status) = &self.status {
            out.push((UserField::Status, FieldValue::Text(status.to_string())));
        }
        out
    }
}
