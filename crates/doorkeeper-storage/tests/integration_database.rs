//! Integration tests for database connection and pooling
//!
//! Run with: cargo test --package doorkeeper-storage --test integration_database

use doorkeeper_core::CardUid;
use doorkeeper_storage::connection::{Database, DatabaseConfig};
use doorkeeper_storage::{CredentialStore, SqliteCredentialStore};
use std::sync::Arc;
use tokio::sync::Barrier;
use tokio::task::JoinSet;

#[tokio::test]
async fn test_in_memory_database() {
    let db = Database::in_memory().await.unwrap();
    db.health_check().await.unwrap();
    db.close().await;
}

#[tokio::test]
async fn test_concurrent_reads_on_file_pool() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = DatabaseConfig::new(dir.path().join("door.db").to_string_lossy()).max_connections(4);
    let db = Database::new(&config).await.unwrap();

    const NUM_CONCURRENT_TASKS: i64 = 10;
    let barrier = Arc::new(Barrier::new(NUM_CONCURRENT_TASKS as usize));
    let mut tasks = JoinSet::new();

    for i in 0..NUM_CONCURRENT_TASKS {
        let db = db.clone();
        let barrier = barrier.clone();
        tasks.spawn(async move {
            barrier.wait().await;
            let value: i64 = sqlx::query_scalar("SELECT ?")
                .bind(i)
                .fetch_one(db.pool())
                .await
                .unwrap();
            (i, value)
        });
    }

    let mut seen = 0;
    while let Some(result) = tasks.join_next().await {
        let (sent, received) = result.unwrap();
        assert_eq!(sent, received);
        seen += 1;
    }
    assert_eq!(seen, NUM_CONCURRENT_TASKS);

    db.close().await;
}

#[tokio::test]
async fn test_migration_idempotency() {
    let db = Database::in_memory().await.unwrap();

    db.migrate().await.unwrap();
    db.migrate().await.unwrap();

    let tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
         ('users', 'key_bindings', 'access_logs', 'groups', 'authorization_tags', \
          'group_tags', 'user_groups', 'user_statuses')",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(tables, 8);

    let statuses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_statuses")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(statuses, 2);

    db.close().await;
}

#[tokio::test]
async fn test_reopen_keeps_data() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = DatabaseConfig::new(dir.path().join("door.db").to_string_lossy());

    let db = Database::new(&config).await.unwrap();
    sqlx::query("INSERT INTO users (email) VALUES ('kept@example.org')")
        .execute(db.pool())
        .await
        .unwrap();
    db.close().await;

    let db = Database::new(&config).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
    db.close().await;
}

#[tokio::test]
async fn test_concurrent_binds_of_one_key() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = DatabaseConfig::new(dir.path().join("door.db").to_string_lossy()).max_connections(4);
    let store = Arc::new(SqliteCredentialStore::open(config).await.unwrap());

    let db = store.database().await;
    let mut users = Vec::new();
    for email in ["one@example.org", "two@example.org"] {
        let id = sqlx::query("INSERT INTO users (email) VALUES (?)")
            .bind(email)
            .execute(db.pool())
            .await
            .unwrap()
            .last_insert_rowid();
        users.push(id);
    }

    let uid = CardUid::parse("04a1b2c3").unwrap();
    let barrier = Arc::new(Barrier::new(users.len()));
    let mut tasks = JoinSet::new();
    for user in users {
        let store = store.clone();
        let barrier = barrier.clone();
        let uid = uid.clone();
        tasks.spawn(async move {
            barrier.wait().await;
            store.bind_key(&uid, user, false).await
        });
    }

    let mut successes = 0;
    while let Some(result) = tasks.join_next().await {
        if result.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    let bindings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM key_bindings")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(bindings, 1);
}
