#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::KeyBinding;
use doorkeeper_core::{CardUid, UserId};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::info;

/// Repository trait for NFC key bindings.
///
/// Creating a binding goes through [`crate::transaction::enroll_key`], since it
/// must be logged and activate the user in the same transaction.
pub trait KeyRepository: Send + Sync {
    /// Current owner of a key
    async fn find_owner(&self, uid: &CardUid) -> StorageResult<Option<UserId>>;

    /// Keys bound to a user
    async fn list_for_user(&self, user_id: UserId) -> StorageResult<Vec<KeyBinding>>;

    /// Remove the binding of `uid` to `user_id`
    ///
    /// A binding that exists but belongs to another user is left intact and
    /// reported as not found.
    async fn delete(&self, uid: &CardUid, user_id: UserId) -> StorageResult<()>;
}

pub(crate) async fn owner_of<'e, E>(executor: E, uid: &CardUid) -> StorageResult<Option<UserId>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let owner = sqlx::query_scalar("SELECT user_id FROM key_bindings WHERE key_uid = ?")
        .bind(uid.as_str())
        .fetch_optional(executor)
        .await?;
    Ok(owner)
}

/// SQLite implementation of KeyRepository
pub struct SqliteKeyRepository {
    pool: SqlitePool,
}

impl SqliteKeyRepository {
    /// Create a new SQLite key repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl KeyRepository for SqliteKeyRepository {
    async fn find_owner(&self, uid: &CardUid) -> StorageResult<Option<UserId>> {
        owner_of(&self.pool, uid).await
    }

    async fn list_for_user(&self, user_id: UserId) -> StorageResult<Vec<KeyBinding>> {
        let keys = sqlx::query_as::<_, KeyBinding>(
            "SELECT key_uid, user_id, created_at FROM key_bindings WHERE user_id = ? ORDER BY key_uid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    async fn delete(&self, uid: &CardUid, user_id: UserId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM key_bindings WHERE key_uid = ? AND user_id = ?")
            .bind(uid.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(
                "KeyBinding",
                "key_uid",
                format!("{uid} (user {user_id})"),
            ));
        }

        info!(key_uid = %uid, user_id, "key unbound");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    async fn setup() -> (Database, SqliteKeyRepository, UserId, UserId) {
        let db = Database::in_memory().await.unwrap();
        let mut ids = Vec::new();
        for email in ["a@example.org", "b@example.org"] {
            let id = sqlx::query("INSERT INTO users (email) VALUES (?)")
                .bind(email)
                .execute(db.pool())
                .await
                .unwrap()
                .last_insert_rowid();
            ids.push(id);
        }
        sqlx::query("INSERT INTO key_bindings (key_uid, user_id) VALUES ('04a1b2c3', ?)")
            .bind(ids[0])
            .execute(db.pool())
            .await
            .unwrap();

        let repo = SqliteKeyRepository::new(db.pool().clone());
        (db, repo, ids[0], ids[1])
    }

    #[tokio::test]
    async fn test_find_owner() {
        let (_db, repo, owner, _) = setup().await;

        let uid = CardUid::parse("04:A1:B2:C3").unwrap();
        assert_eq!(repo.find_owner(&uid).await.unwrap(), Some(owner));
        assert_eq!(repo.find_owner(&CardUid::parse("deadbeef").unwrap()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_for_user() {
        let (_db, repo, owner, other) = setup().await;

        let keys = repo.list_for_user(owner).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].key_uid, "04a1b2c3");
        assert!(repo.list_for_user(other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_requires_matching_owner() {
        let (_db, repo, owner, other) = setup().await;
        let uid = CardUid::parse("04a1b2c3").unwrap();

        let err = repo.delete(&uid, other).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(repo.find_owner(&uid).await.unwrap(), Some(owner));

        repo.delete(&uid, owner).await.unwrap();
        assert_eq!(repo.find_owner(&uid).await.unwrap(), None);
    }
}
