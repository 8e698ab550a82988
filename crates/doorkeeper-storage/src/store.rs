#![allow(async_fn_in_trait)]

use crate::connection::{Database, DatabaseConfig};
use crate::error::{StorageError, StorageResult};
use crate::models::{NewLogEntry, User};
use crate::repositories::{
    AccessLogRepository, KeyRepository, SqliteAccessLogRepository, SqliteKeyRepository,
    SqliteUserRepository, UserRepository,
};
use crate::transaction;
use doorkeeper_core::{CardUid, UserId};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// What the access engine and the enrollment tool need from persistence.
pub trait CredentialStore: Send + Sync {
    /// Health-check the connection, rebuilding the pool if the store is unavailable.
    async fn ensure_connection(&self) -> StorageResult<()>;

    async fn resolve_by_key_id(&self, uid: &CardUid) -> StorageResult<Option<User>>;

    async fn resolve_by_user_id(&self, id: UserId) -> StorageResult<Option<User>>;

    async fn resolve_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    async fn append_log(&self, entry: &NewLogEntry) -> StorageResult<i64>;

    /// Bind `uid` to `user_id`, log `assign`, activate the user and log
    /// `activate`, all in one transaction.
    async fn bind_key(&self, uid: &CardUid, user_id: UserId, allow_steal: bool)
    -> StorageResult<()>;

    /// Remove the binding of `uid` to `user_id`.
    async fn unbind_key(&self, uid: &CardUid, user_id: UserId) -> StorageResult<()>;
}

/// [`CredentialStore`] over a SQLite pool that can be rebuilt in place.
pub struct SqliteCredentialStore {
    db: RwLock<Database>,
    config: Option<DatabaseConfig>,
}

impl SqliteCredentialStore {
    /// Open the database described by `config`; the config is kept for reconnects.
    pub async fn open(config: DatabaseConfig) -> StorageResult<Self> {
        let db = Database::new(&config).await?;
        Ok(Self {
            db: RwLock::new(db),
            config: Some(config),
        })
    }

    /// Wrap an existing database. Without a config the store cannot reconnect.
    pub fn from_database(db: Database) -> Self {
        Self {
            db: RwLock::new(db),
            config: None,
        }
    }

    /// Handle to the current database.
    pub async fn database(&self) -> Database {
        self.db.read().await.clone()
    }

    async fn reconnect(&self, cause: StorageError) -> StorageResult<()> {
        let Some(config) = &self.config else {
            error!(error = %cause, "store unavailable and no configuration to reconnect with");
            return Err(cause);
        };

        warn!(error = %cause, path = %config.database_path, "store unavailable, reconnecting");
        let fresh = Database::new(config).await.inspect_err(|e| {
            error!(error = %e, "reconnect failed");
        })?;

        let stale = std::mem::replace(&mut *self.db.write().await, fresh);
        stale.close().await;
        info!("store reconnected");
        Ok(())
    }
}

impl CredentialStore for SqliteCredentialStore {
    async fn ensure_connection(&self) -> StorageResult<()> {
        let health = self.db.read().await.health_check().await;
        match health {
            Ok(()) => Ok(()),
            Err(e) if e.is_unavailable() => self.reconnect(e).await,
            Err(e) => Err(e),
        }
    }

    async fn resolve_by_key_id(&self, uid: &CardUid) -> StorageResult<Option<User>> {
        let db = self.database().await;
        SqliteUserRepository::new(db.pool().clone()).find_by_key(uid).await
    }

    async fn resolve_by_user_id(&self, id: UserId) -> StorageResult<Option<User>> {
        let db = self.database().await;
        SqliteUserRepository::new(db.pool().clone()).find_by_id(id).await
    }

    async fn resolve_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let db = self.database().await;
        SqliteUserRepository::new(db.pool().clone()).find_by_email(email).await
    }

    async fn append_log(&self, entry: &NewLogEntry) -> StorageResult<i64> {
        let db = self.database().await;
        SqliteAccessLogRepository::new(db.pool().clone()).append(entry).await
    }

    async fn bind_key(
        &self,
        uid: &CardUid,
        user_id: UserId,
        allow_steal: bool,
    ) -> StorageResult<()> {
        let db = self.database().await;
        let mut tx = db.pool().begin().await?;
        transaction::enroll_key(&mut tx, uid, user_id, allow_steal).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn unbind_key(&self, uid: &CardUid, user_id: UserId) -> StorageResult<()> {
        let db = self.database().await;
        SqliteKeyRepository::new(db.pool().clone()).delete(uid, user_id).await
    }
}
