#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult, is_unique_violation};
use crate::models::Group;
use crate::repositories::tag::validate_name;
use doorkeeper_core::UserId;
use sqlx::SqlitePool;
use tracing::info;

const GROUP_COLUMNS: &str = "g.id, g.name, g.description, \
     (SELECT COUNT(*) FROM user_groups ug WHERE ug.group_id = g.id) AS member_count";

/// Repository trait for groups, their tags and their members
pub trait GroupRepository: Send + Sync {
    /// Create a group and return its id
    async fn create(&self, name: &str, description: Option<&str>) -> StorageResult<i64>;

    /// Find a group by exact name
    async fn find_by_name(&self, name: &str) -> StorageResult<Option<Group>>;

    /// All groups ordered by name, with member count and tag names
    async fn list(&self) -> StorageResult<Vec<Group>>;

    /// Grant (`on`) or revoke a tag for a group
    async fn set_authorization(&self, group_id: i64, tag: &str, on: bool) -> StorageResult<()>;

    /// Add a user to a group (idempotent)
    async fn add_member(&self, group_id: i64, user_id: UserId) -> StorageResult<()>;

    /// Remove a user from a group
    async fn remove_member(&self, group_id: i64, user_id: UserId) -> StorageResult<()>;

    /// Delete a group with its memberships and tag grants
    async fn delete(&self, group_id: i64) -> StorageResult<()>;
}

/// SQLite implementation of GroupRepository
pub struct SqliteGroupRepository {
    pool: SqlitePool,
}

impl SqliteGroupRepository {
    /// Create a new SQLite group repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_tags(&self, mut group: Group) -> StorageResult<Group> {
        group.tags = sqlx::query_scalar(
            r#"
            SELECT t.name
            FROM authorization_tags t
            JOIN group_tags gt ON gt.tag_id = t.id
            WHERE gt.group_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(group.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(group)
    }

    async fn ensure_group(&self, group_id: i64) -> StorageResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM groups WHERE id = ?)")
            .bind(group_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(StorageError::not_found("Group", "id", group_id));
        }
        Ok(())
    }
}

impl GroupRepository for SqliteGroupRepository {
    async fn create(&self, name: &str, description: Option<&str>) -> StorageResult<i64> {
        validate_name("group", name)?;
        let name = name.trim();

        let result = sqlx::query("INSERT INTO groups (name, description) VALUES (?, ?)")
            .bind(name)
            .bind(description)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StorageError::validation(format!("group '{name}' already exists"))
                } else {
                    e.into()
                }
            })?;

        info!(group = name, "group created");
        Ok(result.last_insert_rowid())
    }

    async fn find_by_name(&self, name: &str) -> StorageResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups g WHERE g.name = ?"
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        match group {
            Some(group) => Ok(Some(self.load_tags(group).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> StorageResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups g ORDER BY g.name"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut loaded = Vec::with_capacity(groups.len());
        for group in groups {
            loaded.push(self.load_tags(group).await?);
        }
        Ok(loaded)
    }

    async fn set_authorization(&self, group_id: i64, tag: &str, on: bool) -> StorageResult<()> {
        self.ensure_group(group_id).await?;

        let tag_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM authorization_tags WHERE name = ?")
                .bind(tag.trim())
                .fetch_optional(&self.pool)
                .await?;
        let tag_id = tag_id.ok_or_else(|| StorageError::not_found("Tag", "name", tag.trim()))?;

        if on {
            sqlx::query("INSERT OR IGNORE INTO group_tags (group_id, tag_id) VALUES (?, ?)")
                .bind(group_id)
                .bind(tag_id)
                .execute(&self.pool)
                .await?;
        } else {
            sqlx::query("DELETE FROM group_tags WHERE group_id = ? AND tag_id = ?")
                .bind(group_id)
                .bind(tag_id)
                .execute(&self.pool)
                .await?;
        }

        info!(group_id, tag = tag.trim(), granted = on, "group authorization changed");
        Ok(())
    }

    async fn add_member(&self, group_id: i64, user_id: UserId) -> StorageResult<()> {
        self.ensure_group(group_id).await?;

        let user_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = ?)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        if !user_exists {
            return Err(StorageError::not_found("User", "id", user_id));
        }

        sqlx::query("INSERT OR IGNORE INTO user_groups (user_id, group_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        info!(group_id, user_id, "member added");
        Ok(())
    }

    async fn remove_member(&self, group_id: i64, user_id: UserId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM user_groups WHERE user_id = ? AND group_id = ?")
            .bind(user_id)
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(
                "Membership",
                "user_id",
                format!("{user_id} (group {group_id})"),
            ));
        }

        info!(group_id, user_id, "member removed");
        Ok(())
    }

    async fn delete(&self, group_id: i64) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Group", "id", group_id));
        }

        info!(group_id, "group deleted");
        Ok(())
    }
}
