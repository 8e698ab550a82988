#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult, is_unique_violation};
use crate::models::user::{FieldValue, validate_email};
use crate::models::{NewUser, User, UserUpdate};
use crate::password::{self, BCRYPT_COST};
use crate::search::{SearchTerm, like_pattern, parse_query};
use doorkeeper_core::constants::STATUS_INACTIVE;
use doorkeeper_core::{CardUid, UserId};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, warn};

pub(crate) const USER_COLUMNS: &str = "u.id, u.email, u.first_name, u.last_name, u.password_hash, \
     u.status, u.join_date, u.created_at, u.updated_at";

/// Repository trait for User entity operations
///
/// Every returned [`User`] carries its bound key UIDs and group names.
pub trait UserRepository: Send + Sync {
    /// Create a new user and return its id
    async fn create(&self, user: &NewUser) -> StorageResult<UserId>;

    /// Find a user by ID
    async fn find_by_id(&self, id: UserId) -> StorageResult<Option<User>>;

    /// Find a user by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    /// Find the owner of a key
    async fn find_by_key(&self, uid: &CardUid) -> StorageResult<Option<User>>;

    /// All users ordered by name
    async fn list_all(&self) -> StorageResult<Vec<User>>;

    /// Apply a partial update
    async fn update(&self, id: UserId, update: &UserUpdate) -> StorageResult<()>;

    /// Delete a user together with its keys, memberships and log entries
    async fn delete(&self, id: UserId) -> StorageResult<()>;

    /// Replace the user's password
    async fn set_password(&self, id: UserId, plaintext: &str) -> StorageResult<()>;

    /// Check a password attempt for the user with `email`
    async fn check_password(&self, email: &str, attempt: &str) -> StorageResult<bool>;

    /// Legal values of the status column
    async fn valid_statuses(&self) -> StorageResult<Vec<String>>;

    /// Users matching a search query (see [`crate::search`])
    async fn search(&self, query: &str) -> StorageResult<Vec<User>>;
}

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
    bcrypt_cost: u32,
}

impl SqliteUserRepository {
    /// Create a new SQLite user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            bcrypt_cost: BCRYPT_COST,
        }
    }

    /// Override the bcrypt cost (tests use the minimum of 4).
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    async fn load_relations(&self, mut user: User) -> StorageResult<User> {
        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT key_uid FROM key_bindings WHERE user_id = ? ORDER BY key_uid",
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;

        user.key_uids = keys
            .into_iter()
            .filter_map(|key| match CardUid::parse(&key) {
                Ok(uid) => Some(uid),
                Err(e) => {
                    warn!(user_id = user.id, error = %e, "skipping malformed key binding");
                    None
                }
            })
            .collect();

        user.groups = sqlx::query_scalar(
            r#"
            SELECT g.name
            FROM groups g
            JOIN user_groups ug ON ug.group_id = g.id
            WHERE ug.user_id = ?
            ORDER BY g.name
            "#,
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(user)
    }

    async fn load_optional(&self, user: Option<User>) -> StorageResult<Option<User>> {
        match user {
            Some(user) => Ok(Some(self.load_relations(user).await?)),
            None => Ok(None),
        }
    }

    async fn load_all(&self, users: Vec<User>) -> StorageResult<Vec<User>> {
        let mut loaded = Vec::with_capacity(users.len());
        for user in users {
            loaded.push(self.load_relations(user).await?);
        }
        Ok(loaded)
    }

    async fn ensure_valid_status(&self, status: &str) -> StorageResult<()> {
        let statuses = self.valid_statuses().await?;
        if !statuses.iter().any(|s| s == status) {
            return Err(StorageError::validation(format!(
                "'{status}' is not a valid status (expected one of: {})",
                statuses.join(", ")
            )));
        }
        Ok(())
    }
}

fn duplicate_email(email: &str) -> StorageError {
    StorageError::validation(format!("email '{email}' is already registered"))
}

impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &NewUser) -> StorageResult<UserId> {
        user.validate()?;

        let status = user
            .status
            .as_ref()
            .map(|s| s.as_str())
            .unwrap_or(STATUS_INACTIVE);
        self.ensure_valid_status(status).await?;

        let password_hash = match user.password.as_deref() {
            Some(password) => Some(password::hash_password(password, self.bcrypt_cost).await?),
            None => None,
        };

        let email = user.email.trim();
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, first_name, last_name, password_hash, status, join_date)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(password_hash)
        .bind(status)
        .bind(user.join_date)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_email(email)
            } else {
                e.into()
            }
        })?;

        let id = result.last_insert_rowid();
        info!(user_id = id, email, "user created");
        Ok(id)
    }

    async fn find_by_id(&self, id: UserId) -> StorageResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.load_optional(user).await
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        self.load_optional(user).await
    }

    async fn find_by_key(&self, uid: &CardUid) -> StorageResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u \
             JOIN key_bindings k ON k.user_id = u.id \
             WHERE k.key_uid = ?"
        ))
        .bind(uid.as_str())
        .fetch_optional(&self.pool)
        .await?;

        self.load_optional(user).await
    }

    async fn list_all(&self) -> StorageResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u ORDER BY u.last_name, u.first_name, u.id"
        ))
        .fetch_all(&self.pool)
        .await?;

        self.load_all(users).await
    }

    async fn update(&self, id: UserId, update: &UserUpdate) -> StorageResult<()> {
        let assignments = update.assignments();
        if assignments.is_empty() {
            return Err(StorageError::validation("no fields to update"));
        }
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        if let Some(status) = &update.status {
            self.ensure_valid_status(status.as_str()).await?;
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE users SET ");
        let mut set = query.separated(", ");
        for (field, value) in assignments {
            set.push(format!("{} = ", field.column()));
            match value {
                FieldValue::Text(text) => set.push_bind_unseparated(text),
                FieldValue::Date(date) => set.push_bind_unseparated(date),
            };
        }
        set.push("updated_at = datetime('now')");
        query.push(" WHERE id = ").push_bind(id);

        let result = query.build().execute(&self.pool).await.map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_email(update.email.as_deref().unwrap_or_default())
            } else {
                e.into()
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("User", "id", id));
        }

        info!(user_id = id, "user updated");
        Ok(())
    }

    async fn delete(&self, id: UserId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("User", "id", id));
        }

        info!(user_id = id, "user deleted");
        Ok(())
    }

    async fn set_password(&self, id: UserId, plaintext: &str) -> StorageResult<()> {
        let hash = password::hash_password(plaintext, self.bcrypt_cost).await?;

        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("User", "id", id));
        }
        Ok(())
    }

    async fn check_password(&self, email: &str, attempt: &str) -> StorageResult<bool> {
        let hash: Option<Option<String>> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE email = ?")
                .bind(email.trim())
                .fetch_optional(&self.pool)
                .await?;

        password::verify_password(attempt, hash.flatten().as_deref()).await
    }

    async fn valid_statuses(&self) -> StorageResult<Vec<String>> {
        let statuses = sqlx::query_scalar("SELECT name FROM user_statuses ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(statuses)
    }

    async fn search(&self, query: &str) -> StorageResult<Vec<User>> {
        let terms = parse_query(query)?;

        let mut sql = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE 1 = 1"
        ));
        for term in terms {
            match term {
                SearchTerm::Text(value) => {
                    let pattern = like_pattern(&value);
                    sql.push(" AND (LOWER(u.first_name) LIKE ")
                        .push_bind(pattern.clone())
                        .push(" ESCAPE '\\' OR LOWER(u.last_name) LIKE ")
                        .push_bind(pattern.clone())
                        .push(" ESCAPE '\\' OR LOWER(u.email) LIKE ")
                        .push_bind(pattern.clone())
                        .push(
                            " ESCAPE '\\' OR EXISTS (SELECT 1 FROM key_bindings k \
                             WHERE k.user_id = u.id AND LOWER(k.key_uid) LIKE ",
                        )
                        .push_bind(pattern)
                        .push(" ESCAPE '\\'))");
                }
                SearchTerm::Group(name) => {
                    sql.push(
                        " AND EXISTS (SELECT 1 FROM user_groups ug \
                         JOIN groups g ON g.id = ug.group_id \
                         WHERE ug.user_id = u.id AND LOWER(g.name) = ",
                    )
                    .push_bind(name)
                    .push(")");
                }
                SearchTerm::Tag(name) => {
                    sql.push(
                        " AND EXISTS (SELECT 1 FROM user_groups ug \
                         JOIN group_tags gt ON gt.group_id = ug.group_id \
                         JOIN authorization_tags t ON t.id = gt.tag_id \
                         WHERE ug.user_id = u.id AND LOWER(t.name) = ",
                    )
                    .push_bind(name)
                    .push(")");
                }
            }
        }
        sql.push(" ORDER BY u.last_name, u.first_name, u.id");

        let users: Vec<User> = sql.build_query_as::<User>().fetch_all(&self.pool).await?;
        self.load_all(users).await
    }
}
