#![allow(async_fn_in_trait)]

//! Derived authorization relation.
//!
//! A user holds a tag iff the user is `active` and belongs to at least one
//! group that holds the tag. Nothing is cached; every call runs one join.

use crate::error::StorageResult;
use doorkeeper_core::constants::STATUS_ACTIVE;
use doorkeeper_core::{CardUid, UserId};
use sqlx::SqlitePool;
use tracing::debug;

/// Tag checks against the membership graph
pub trait AuthorizationQuery: Send + Sync {
    /// Whether `user_id` is authorized for `tag`. Unknown users and tags give `false`.
    async fn user_has_tag(&self, user_id: UserId, tag: &str) -> StorageResult<bool>;

    /// Whether the owner of `uid` is authorized for `tag`. Unbound keys give `false`.
    async fn key_has_tag(&self, uid: &CardUid, tag: &str) -> StorageResult<bool>;
}

/// SQLite implementation of AuthorizationQuery
pub struct SqliteAuthorizationQuery {
    pool: SqlitePool,
}

impl SqliteAuthorizationQuery {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AuthorizationQuery for SqliteAuthorizationQuery {
    async fn user_has_tag(&self, user_id: UserId, tag: &str) -> StorageResult<bool> {
        let authorized: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM users u
                JOIN user_groups ug ON ug.user_id = u.id
                JOIN group_tags gt ON gt.group_id = ug.group_id
                JOIN authorization_tags t ON t.id = gt.tag_id
                WHERE u.id = ? AND u.status = ? AND t.name = ?
            )
            "#,
        )
        .bind(user_id)
        .bind(STATUS_ACTIVE)
        .bind(tag)
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id, tag, authorized, "authorization checked");
        Ok(authorized)
    }

    async fn key_has_tag(&self, uid: &CardUid, tag: &str) -> StorageResult<bool> {
        let authorized: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM key_bindings k
                JOIN users u ON u.id = k.user_id
                JOIN user_groups ug ON ug.user_id = u.id
                JOIN group_tags gt ON gt.group_id = ug.group_id
                JOIN authorization_tags t ON t.id = gt.tag_id
                WHERE k.key_uid = ? AND u.status = ? AND t.name = ?
            )
            "#,
        )
        .bind(uid.as_str())
        .bind(STATUS_ACTIVE)
        .bind(tag)
        .fetch_one(&self.pool)
        .await?;

        debug!(key_uid = %uid, tag, authorized, "authorization checked");
        Ok(authorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use rstest::rstest;

    /// One active and one inactive member of "makers", which holds "woodshop".
    async fn fixture() -> (Database, SqliteAuthorizationQuery) {
        let db = Database::in_memory().await.unwrap();
        for sql in [
            "INSERT INTO users (id, email, status) VALUES (1, 'a@example.org', 'active')",
            "INSERT INTO users (id, email, status) VALUES (2, 'b@example.org', 'inactive')",
            "INSERT INTO users (id, email, status) VALUES (3, 'c@example.org', 'active')",
            "INSERT INTO groups (id, name) VALUES (1, 'makers')",
            "INSERT INTO authorization_tags (id, name) VALUES (1, 'woodshop')",
            "INSERT INTO authorization_tags (id, name) VALUES (2, 'laser')",
            "INSERT INTO group_tags (group_id, tag_id) VALUES (1, 1)",
            "INSERT INTO user_groups (user_id, group_id) VALUES (1, 1)",
            "INSERT INTO user_groups (user_id, group_id) VALUES (2, 1)",
            "INSERT INTO key_bindings (key_uid, user_id) VALUES ('0a0b0c0d', 1)",
            "INSERT INTO key_bindings (key_uid, user_id) VALUES ('01020304', 2)",
        ] {
            sqlx::query(sql).execute(db.pool()).await.unwrap();
        }
        let query = SqliteAuthorizationQuery::new(db.pool().clone());
        (db, query)
    }

    #[rstest]
    #[case::active_member(1, "woodshop", true)]
    #[case::inactive_member(2, "woodshop", false)]
    #[case::not_a_member(3, "woodshop", false)]
    #[case::tag_not_held(1, "laser", false)]
    #[case::unknown_tag(1, "nope", false)]
    #[case::unknown_user(99, "woodshop", false)]
    #[tokio::test]
    async fn test_user_has_tag(#[case] user: UserId, #[case] tag: &str, #[case] expected: bool) {
        let (_db, query) = fixture().await;
        assert_eq!(query.user_has_tag(user, tag).await.unwrap(), expected);
    }

    #[rstest]
    #[case::active_owner("0a0b0c0d", true)]
    #[case::inactive_owner("01020304", false)]
    #[case::unbound("deadbeef", false)]
    #[tokio::test]
    async fn test_key_has_tag(#[case] uid: &str, #[case] expected: bool) {
        let (_db, query) = fixture().await;
        let uid = CardUid::parse(uid).unwrap();
        assert_eq!(query.key_has_tag(&uid, "woodshop").await.unwrap(), expected);
    }
}
