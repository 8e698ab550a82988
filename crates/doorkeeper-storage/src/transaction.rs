//! Transaction-aware operations for atomic multistep writes.
//!
//! These functions accept a SQLite transaction reference, so several writes
//! can be grouped into a single atomic unit. The caller begins the
//! transaction and commits it; dropping it without commit rolls everything
//! back.
//!
//! # Usage Pattern
//!
//! ```no_run
//! use doorkeeper_storage::{Database, DatabaseConfig, transaction};
//! use doorkeeper_core::CardUid;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(&DatabaseConfig::new("doorkeeper.db")).await?;
//! let uid = CardUid::parse("04a1b2c3")?;
//!
//! let mut tx = db.pool().begin().await?;
//! transaction::enroll_key(&mut tx, &uid, 1, false).await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{StorageError, StorageResult, is_unique_violation};
use crate::models::NewLogEntry;
use crate::repositories::access_log::insert_log;
use crate::repositories::key::owner_of;
use doorkeeper_core::constants::STATUS_ACTIVE;
use doorkeeper_core::{CardUid, LogKind, UserId};
use sqlx::{Sqlite, Transaction};
use tracing::info;

/// Check that a user exists within a transaction
///
/// # Errors
///
/// Returns `StorageError::NotFound` if there is no user with `user_id`.
pub async fn ensure_user(tx: &mut Transaction<'_, Sqlite>, user_id: UserId) -> StorageResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = ?)")
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

    if !exists {
        return Err(StorageError::not_found("User", "id", user_id));
    }
    Ok(())
}

/// Bind a key to a user within a transaction
///
/// Without `allow_steal`, a key owned by anyone else fails with
/// `StorageError::Conflict` and the existing binding is untouched. With it,
/// ownership moves to `user_id`. Re-binding a key to its current owner is a
/// no-op.
pub async fn bind_key(
    tx: &mut Transaction<'_, Sqlite>,
    uid: &CardUid,
    user_id: UserId,
    allow_steal: bool,
) -> StorageResult<()> {
    match owner_of(&mut **tx, uid).await? {
        Some(owner) if owner == user_id => return Ok(()),
        Some(owner) if !allow_steal => {
            return Err(StorageError::Conflict {
                key_uid: uid.to_string(),
                owner,
            });
        }
        Some(owner) => info!(key_uid = %uid, from = owner, to = user_id, "reassigning key"),
        None => {}
    }

    let sql = if allow_steal {
        r#"
        INSERT INTO key_bindings (key_uid, user_id) VALUES (?, ?)
        ON CONFLICT (key_uid) DO UPDATE SET user_id = excluded.user_id,
                                            created_at = datetime('now')
        "#
    } else {
        "INSERT INTO key_bindings (key_uid, user_id) VALUES (?, ?)"
    };

    let inserted = sqlx::query(sql)
        .bind(uid.as_str())
        .bind(user_id)
        .execute(&mut **tx)
        .await;

    match inserted {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => {
            // Bound concurrently by another writer since the owner check.
            let owner = owner_of(&mut **tx, uid).await?;
            Err(lost_race(uid, owner, e))
        }
        Err(e) => Err(e.into()),
    }
}

/// Error for an insert that hit a binding created after the owner check.
/// If that binding is already gone again there is no owner to report.
fn lost_race(uid: &CardUid, owner: Option<UserId>, error: sqlx::Error) -> StorageError {
    match owner {
        Some(owner) => StorageError::Conflict {
            key_uid: uid.to_string(),
            owner,
        },
        None => StorageError::Database(error),
    }
}

/// Set a user's status within a transaction
pub async fn set_status(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: UserId,
    status: &str,
) -> StorageResult<()> {
    let result =
        sqlx::query("UPDATE users SET status = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(status)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("User", "id", user_id));
    }
    Ok(())
}

/// Append a log entry within a transaction
pub async fn append_log(
    tx: &mut Transaction<'_, Sqlite>,
    entry: &NewLogEntry,
) -> StorageResult<i64> {
    insert_log(&mut **tx, entry).await
}

/// Enroll a key: bind it, log `assign`, activate the user and log `activate`.
///
/// All four writes land in `tx`; nothing is visible until the caller commits.
///
/// # Errors
///
/// - `StorageError::NotFound` if the user does not exist (nothing is written)
/// - `StorageError::Conflict` if the key belongs to another user and
///   `allow_steal` is false
pub async fn enroll_key(
    tx: &mut Transaction<'_, Sqlite>,
    uid: &CardUid,
    user_id: UserId,
    allow_steal: bool,
) -> StorageResult<()> {
    ensure_user(tx, user_id).await?;
    bind_key(tx, uid, user_id, allow_steal).await?;

    append_log(
        tx,
        &NewLogEntry::new(LogKind::Assign)
            .with_key(uid.clone())
            .with_user(user_id),
    )
    .await?;
    set_status(tx, user_id, STATUS_ACTIVE).await?;
    append_log(tx, &NewLogEntry::new(LogKind::Activate).with_user(user_id)).await?;

    info!(key_uid = %uid, user_id, "key enrolled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    async fn setup() -> (Database, UserId, UserId) {
        let db = Database::in_memory().await.unwrap();
        let mut ids = Vec::new();
        for email in ["owner@example.org", "thief@example.org"] {
            let id = sqlx::query("INSERT INTO users (email) VALUES (?)")
                .bind(email)
                .execute(db.pool())
                .await
                .unwrap()
                .last_insert_rowid();
            ids.push(id);
        }
        (db, ids[0], ids[1])
    }

    async fn count(db: &Database, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(db.pool()).await.unwrap()
    }

    fn uid() -> CardUid {
        CardUid::parse("04a1b2c3").unwrap()
    }

    #[tokio::test]
    async fn test_enroll_commit() {
        let (db, user, _) = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        enroll_key(&mut tx, &uid(), user, false).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(count(&db, "SELECT COUNT(*) FROM key_bindings").await, 1);
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM access_logs WHERE kind IN ('assign', 'activate')").await,
            2
        );
        let status: String = sqlx::query_scalar("SELECT status FROM users WHERE id = ?")
            .bind(user)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(status, "active");
    }

    #[tokio::test]
    async fn test_enroll_rollback() {
        let (db, user, _) = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        enroll_key(&mut tx, &uid(), user, false).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(count(&db, "SELECT COUNT(*) FROM key_bindings").await, 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM access_logs").await, 0);
    }

    #[tokio::test]
    async fn test_conflict_without_steal() {
        let (db, owner, thief) = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        enroll_key(&mut tx, &uid(), owner, false).await.unwrap();
        tx.commit().await.unwrap();

        let logged = count(&db, "SELECT COUNT(*) FROM access_logs").await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = enroll_key(&mut tx, &uid(), thief, false).await.unwrap_err();
        drop(tx);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM access_logs").await, logged);

        match err {
            StorageError::Conflict { owner: o, .. } => assert_eq!(o, owner),
            other => panic!("expected conflict, got {other:?}"),
        }
        let current: i64 = sqlx::query_scalar("SELECT user_id FROM key_bindings")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(current, owner);
    }

    #[tokio::test]
    async fn test_steal_moves_ownership() {
        let (db, owner, thief) = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        enroll_key(&mut tx, &uid(), owner, false).await.unwrap();
        tx.commit().await.unwrap();
        let last_id = count(&db, "SELECT MAX(id) FROM access_logs").await;

        let mut tx = db.pool().begin().await.unwrap();
        enroll_key(&mut tx, &uid(), thief, true).await.unwrap();
        tx.commit().await.unwrap();

        let current: i64 = sqlx::query_scalar("SELECT user_id FROM key_bindings")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(current, thief);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM key_bindings").await, 1);

        let added: Vec<(String, i64)> =
            sqlx::query_as("SELECT kind, user_id FROM access_logs WHERE id > ? ORDER BY id")
                .bind(last_id)
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(
            added,
            vec![("assign".to_string(), thief), ("activate".to_string(), thief)]
        );
    }

    #[test]
    fn test_lost_race_reports_current_owner_only() {
        let err = lost_race(&uid(), Some(7), sqlx::Error::RowNotFound);
        assert!(matches!(err, StorageError::Conflict { owner: 7, .. }));

        let err = lost_race(&uid(), None, sqlx::Error::RowNotFound);
        assert!(matches!(err, StorageError::Database(_)));
        assert!(!err.is_conflict());
    }

    #[tokio::test]
    async fn test_missing_user_writes_nothing() {
        let (db, _, _) = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = enroll_key(&mut tx, &uid(), 999, false).await.unwrap_err();
        drop(tx);

        assert!(err.is_not_found());
        assert_eq!(count(&db, "SELECT COUNT(*) FROM key_bindings").await, 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM access_logs").await, 0);
    }
}
