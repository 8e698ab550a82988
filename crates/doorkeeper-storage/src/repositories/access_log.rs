#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::access_log::AccessLogRow;
use crate::models::{AccessLogEntry, NewLogEntry};
use doorkeeper_core::{CardUid, LogKind, UserId};
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

/// Conjunctive filter over the audit log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub kind: Option<LogKind>,
    pub user_id: Option<UserId>,
    pub key_uid: Option<CardUid>,
}

/// Repository trait for the append-only audit log.
///
/// There is deliberately no update or delete operation: rows only disappear
/// when the user they reference is deleted. Every query returns newest first.
pub trait AccessLogRepository: Send + Sync {
    /// Append an entry and return its id
    async fn append(&self, entry: &NewLogEntry) -> StorageResult<i64>;

    /// Most recent entries of any kind
    async fn recent(&self, limit: i64) -> StorageResult<Vec<AccessLogEntry>>;

    /// Entries referencing a user
    async fn find_by_user(&self, user_id: UserId, limit: i64) -> StorageResult<Vec<AccessLogEntry>>;

    /// Entries referencing a key UID
    async fn find_by_key(&self, uid: &CardUid, limit: i64) -> StorageResult<Vec<AccessLogEntry>>;

    /// Entries of one kind
    async fn find_by_kind(&self, kind: LogKind, limit: i64) -> StorageResult<Vec<AccessLogEntry>>;

    /// Entries matching every set field of `filter`
    async fn find(&self, filter: &LogFilter, limit: i64) -> StorageResult<Vec<AccessLogEntry>>;

    /// Number of entries of one kind
    async fn count_by_kind(&self, kind: LogKind) -> StorageResult<i64>;
}

/// Insert one entry through any executor, so enrollment can log inside its
/// transaction.
pub(crate) async fn insert_log<'e, E>(executor: E, entry: &NewLogEntry) -> StorageResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO access_logs (timestamp, kind, key_uid, user_id, message)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.timestamp_or_now())
    .bind(entry.kind.as_str())
    .bind(entry.key_uid.as_ref().map(CardUid::as_str))
    .bind(entry.user_id)
    .bind(entry.message.as_deref())
    .execute(executor)
    .await?;

    debug!(kind = %entry.kind, id = result.last_insert_rowid(), "log appended");
    Ok(result.last_insert_rowid())
}

/// SQLite implementation of AccessLogRepository
pub struct SqliteAccessLogRepository {
    pool: SqlitePool,
}

impl SqliteAccessLogRepository {
    /// Create a new SQLite access log repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AccessLogRepository for SqliteAccessLogRepository {
    async fn append(&self, entry: &NewLogEntry) -> StorageResult<i64> {
        insert_log(&self.pool, entry).await
    }

    async fn recent(&self, limit: i64) -> StorageResult<Vec<AccessLogEntry>> {
        self.find(&LogFilter::default(), limit).await
    }

    async fn find_by_user(&self, user_id: UserId, limit: i64) -> StorageResult<Vec<AccessLogEntry>> {
        let filter = LogFilter {
            user_id: Some(user_id),
            ..LogFilter::default()
        };
        self.find(&filter, limit).await
    }

    async fn find_by_key(&self, uid: &CardUid, limit: i64) -> StorageResult<Vec<AccessLogEntry>> {
        let filter = LogFilter {
            key_uid: Some(uid.clone()),
            ..LogFilter::default()
        };
        self.find(&filter, limit).await
    }

    async fn find_by_kind(&self, kind: LogKind, limit: i64) -> StorageResult<Vec<AccessLogEntry>> {
        let filter = LogFilter {
            kind: Some(kind),
            ..LogFilter::default()
        };
        self.find(&filter, limit).await
    }

    async fn find(&self, filter: &LogFilter, limit: i64) -> StorageResult<Vec<AccessLogEntry>> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT id, timestamp, kind, key_uid, user_id, message FROM access_logs WHERE 1 = 1",
        );
        if let Some(kind) = filter.kind {
            query.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(uid) = &filter.key_uid {
            query.push(" AND key_uid = ").push_bind(uid.as_str().to_string());
        }
        query.push(" ORDER BY id DESC LIMIT ").push_bind(limit);

        let rows: Vec<AccessLogRow> = query.build_query_as::<AccessLogRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(AccessLogEntry::try_from).collect()
    }

    async fn count_by_kind(&self, kind: LogKind) -> StorageResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM access_logs WHERE kind = ?")
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    fn uid(s: &str) -> CardUid {
        CardUid::parse(s).unwrap()
    }

    async fn setup() -> (Database, SqliteAccessLogRepository) {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteAccessLogRepository::new(db.pool().clone());
        (db, repo)
    }

    async fn create_user(db: &Database, email: &str) -> UserId {
        sqlx::query("INSERT INTO users (email) VALUES (?)")
            .bind(email)
            .execute(db.pool())
            .await
            .unwrap()
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_append_and_recent_newest_first() {
        let (_db, repo) = setup().await;

        let first = repo
            .append(&NewLogEntry::new(LogKind::Message).with_message("boot"))
            .await
            .unwrap();
        let second = repo
            .append(&NewLogEntry::new(LogKind::Deny).with_key(uid("04abcdef")))
            .await
            .unwrap();

        let entries = repo.recent(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, second);
        assert_eq!(entries[1].id, first);
        assert_eq!(entries[0].kind, LogKind::Deny);
        assert_eq!(entries[1].message.as_deref(), Some("boot"));
    }

    #[tokio::test]
    async fn test_find_by_user_and_key() {
        let (db, repo) = setup().await;
        let user = create_user(&db, "ada@example.org").await;

        repo.append(&NewLogEntry::new(LogKind::Unlock).with_key(uid("01020304")).with_user(user))
            .await
            .unwrap();
        repo.append(&NewLogEntry::new(LogKind::Deny).with_key(uid("0a0b0c0d")))
            .await
            .unwrap();

        let by_user = repo.find_by_user(user, 10).await.unwrap();
        assert_eq!(by_user.len(), 1);
        assert_eq!(by_user[0].kind, LogKind::Unlock);

        let by_key = repo.find_by_key(&uid("0a0b0c0d"), 10).await.unwrap();
        assert_eq!(by_key.len(), 1);
        assert_eq!(by_key[0].user_id, None);
    }

    #[tokio::test]
    async fn test_count_and_find_by_kind() {
        let (_db, repo) = setup().await;

        for _ in 0..3 {
            repo.append(&NewLogEntry::new(LogKind::Deny)).await.unwrap();
        }
        repo.append(&NewLogEntry::new(LogKind::Error)).await.unwrap();

        assert_eq!(repo.count_by_kind(LogKind::Deny).await.unwrap(), 3);
        assert_eq!(repo.count_by_kind(LogKind::Unlock).await.unwrap(), 0);
        assert_eq!(repo.find_by_kind(LogKind::Deny, 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_combined_filter() {
        let (db, repo) = setup().await;
        let user = create_user(&db, "grace@example.org").await;

        repo.append(&NewLogEntry::new(LogKind::Assign).with_user(user)).await.unwrap();
        repo.append(&NewLogEntry::new(LogKind::Activate).with_user(user)).await.unwrap();

        let filter = LogFilter {
            kind: Some(LogKind::Activate),
            user_id: Some(user),
            key_uid: None,
        };
        let entries = repo.find(&filter, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, LogKind::Activate);
    }

    #[tokio::test]
    async fn test_explicit_timestamp_is_kept() {
        let (_db, repo) = setup().await;

        repo.append(&NewLogEntry::new(LogKind::Message).at(1_600_000_000))
            .await
            .unwrap();
        let entries = repo.recent(1).await.unwrap();
        assert_eq!(entries[0].timestamp, 1_600_000_000);
    }

    #[tokio::test]
    async fn test_kind_check_constraint() {
        let (db, _repo) = setup().await;

        let result = sqlx::query("INSERT INTO access_logs (timestamp, kind) VALUES (0, 'opened')")
            .execute(db.pool())
            .await;
        assert!(result.is_err());
    }
}
