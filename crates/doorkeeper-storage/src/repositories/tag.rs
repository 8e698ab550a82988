#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult, is_unique_violation};
use crate::models::Tag;
use sqlx::SqlitePool;
use tracing::info;

/// Repository trait for authorization tags
pub trait TagRepository: Send + Sync {
    /// Create a tag and return its id
    async fn create(&self, name: &str) -> StorageResult<i64>;

    /// All tags ordered by name
    async fn list(&self) -> StorageResult<Vec<Tag>>;

    /// Find a tag by exact name
    async fn find_by_name(&self, name: &str) -> StorageResult<Option<Tag>>;
}

/// SQLite implementation of TagRepository
pub struct SqliteTagRepository {
    pool: SqlitePool,
}

impl SqliteTagRepository {
    /// Create a new SQLite tag repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) fn validate_name(kind: &str, name: &str) -> StorageResult<()> {
    if name.trim().is_empty() {
        return Err(StorageError::validation(format!("{kind} name must not be empty")));
    }
    Ok(())
}

impl TagRepository for SqliteTagRepository {
    async fn create(&self, name: &str) -> StorageResult<i64> {
        validate_name("tag", name)?;
        let name = name.trim();

        let result = sqlx::query("INSERT INTO authorization_tags (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StorageError::validation(format!("tag '{name}' already exists"))
                } else {
                    e.into()
                }
            })?;

        info!(tag = name, "tag created");
        Ok(result.last_insert_rowid())
    }

    async fn list(&self) -> StorageResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM authorization_tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(tags)
    }

    async fn find_by_name(&self, name: &str) -> StorageResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name FROM authorization_tags WHERE name = ?")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    #[tokio::test]
    async fn test_create_and_list() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteTagRepository::new(db.pool().clone());

        repo.create("woodshop").await.unwrap();
        repo.create("front-door").await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["front-door", "woodshop"]);
        assert!(repo.find_by_name("woodshop").await.unwrap().is_some());
        assert!(repo.find_by_name("laser").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_and_empty_names() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteTagRepository::new(db.pool().clone());

        repo.create("laser").await.unwrap();
        assert!(matches!(repo.create("laser").await, Err(StorageError::Validation(_))));
        assert!(matches!(repo.create("  ").await, Err(StorageError::Validation(_))));
    }
}
