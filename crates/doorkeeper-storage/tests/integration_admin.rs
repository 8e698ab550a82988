//! End-to-end tests of the administrative surface against one database.

use doorkeeper_core::{CardUid, LogKind, UserId};
use doorkeeper_storage::{
    AccessLogRepository, AuthorizationQuery, CredentialStore, Database, GroupRepository, NewUser,
    SqliteAccessLogRepository, SqliteAuthorizationQuery, SqliteCredentialStore,
    SqliteGroupRepository, SqliteTagRepository, SqliteUserRepository, StorageError,
    TagRepository, UserField, UserRepository, UserUpdate,
};
use rstest::rstest;

struct Fixture {
    store: SqliteCredentialStore,
    users: SqliteUserRepository,
    groups: SqliteGroupRepository,
    logs: SqliteAccessLogRepository,
    auth: SqliteAuthorizationQuery,
    smith: UserId,
    jones: UserId,
}

/// Two users, each with a key. Smith belongs to "group name", which holds
/// the tag "group name"; Jones belongs to nothing.
async fn fixture() -> Fixture {
    let db = Database::in_memory().await.unwrap();
    let pool = db.pool().clone();

    let users = SqliteUserRepository::new(pool.clone()).with_bcrypt_cost(4);
    let groups = SqliteGroupRepository::new(pool.clone());
    let tags = SqliteTagRepository::new(pool.clone());

    let smith = users
        .create(&NewUser::new("jsmith@example.org", "John", "Smith"))
        .await
        .unwrap();
    let jones = users
        .create(&NewUser::new("mary@example.org", "Mary", "Jones"))
        .await
        .unwrap();

    tags.create("group name").await.unwrap();
    let group = groups.create("group name", None).await.unwrap();
    groups.set_authorization(group, "group name", true).await.unwrap();
    groups.add_member(group, smith).await.unwrap();

    let store = SqliteCredentialStore::from_database(db);
    store
        .bind_key(&CardUid::parse("04aabbcc").unwrap(), smith, false)
        .await
        .unwrap();
    store
        .bind_key(&CardUid::parse("04ddeeff").unwrap(), jones, false)
        .await
        .unwrap();

    Fixture {
        store,
        users,
        groups,
        logs: SqliteAccessLogRepository::new(pool.clone()),
        auth: SqliteAuthorizationQuery::new(pool),
        smith,
        jones,
    }
}

#[rstest]
#[case::surname("smith", &["jsmith@example.org"])]
#[case::first_name_any_case("MARY", &["mary@example.org"])]
#[case::key_fragment("04dd", &["mary@example.org"])]
#[case::shared_email_domain("example", &["mary@example.org", "jsmith@example.org"])]
#[case::group_qualifier("group:\"group name\"", &["jsmith@example.org"])]
#[case::tag_qualifier("tag:\"Group Name\"", &["jsmith@example.org"])]
#[case::terms_are_anded("tag:\"group name\" mary", &[])]
#[case::empty_query("", &["mary@example.org", "jsmith@example.org"])]
#[tokio::test]
async fn test_search(#[case] query: &str, #[case] expected: &[&str]) {
    let f = fixture().await;

    let emails: Vec<String> = f
        .users
        .search(query)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.email)
        .collect();
    assert_eq!(emails, expected);
}

#[tokio::test]
async fn test_search_unknown_qualifier() {
    let f = fixture().await;
    assert!(matches!(
        f.users.search("status:active").await,
        Err(StorageError::Validation(_))
    ));
}

#[tokio::test]
async fn test_enrollment_activates_and_logs() {
    let f = fixture().await;

    let smith = f.users.find_by_id(f.smith).await.unwrap().unwrap();
    assert!(smith.is_active());
    assert_eq!(smith.groups, vec!["group name"]);

    let kinds: Vec<LogKind> = f
        .logs
        .find_by_user(f.smith, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds, vec![LogKind::Activate, LogKind::Assign]);
}

#[tokio::test]
async fn test_authorization_follows_status() {
    let f = fixture().await;

    assert!(f.auth.user_has_tag(f.smith, "group name").await.unwrap());
    assert!(!f.auth.user_has_tag(f.jones, "group name").await.unwrap());

    let deactivate = UserUpdate::new().set(UserField::Status, "inactive").unwrap();
    f.users.update(f.smith, &deactivate).await.unwrap();

    assert!(!f.auth.user_has_tag(f.smith, "group name").await.unwrap());
    assert!(
        !f.auth
            .key_has_tag(&CardUid::parse("04aabbcc").unwrap(), "group name")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_steal_and_conflict_through_store() {
    let f = fixture().await;
    let smiths_key = CardUid::parse("04aabbcc").unwrap();

    let before = f.logs.recent(100).await.unwrap().len();

    let err = f.store.bind_key(&smiths_key, f.jones, false).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(f.store.resolve_by_key_id(&smiths_key).await.unwrap().unwrap().id, f.smith);
    assert_eq!(f.logs.recent(100).await.unwrap().len(), before);

    f.store.bind_key(&smiths_key, f.jones, true).await.unwrap();
    assert_eq!(f.store.resolve_by_key_id(&smiths_key).await.unwrap().unwrap().id, f.jones);

    let after = f.logs.recent(100).await.unwrap();
    assert_eq!(after.len(), before + 2);
    // Newest first: the assignment, then the activation it triggered.
    let added: Vec<_> = after[..2].iter().rev().map(|e| (e.kind, e.user_id)).collect();
    assert_eq!(
        added,
        vec![(LogKind::Assign, Some(f.jones)), (LogKind::Activate, Some(f.jones))]
    );
    assert_eq!(after[1].key_uid.as_ref(), Some(&smiths_key));
}

#[tokio::test]
async fn test_unbind_someone_elses_key() {
    let f = fixture().await;
    let smiths_key = CardUid::parse("04aabbcc").unwrap();

    let err = f.store.unbind_key(&smiths_key, f.jones).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(f.store.resolve_by_key_id(&smiths_key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_cascades() {
    let f = fixture().await;

    f.users.delete(f.smith).await.unwrap();

    assert!(
        f.store
            .resolve_by_key_id(&CardUid::parse("04aabbcc").unwrap())
            .await
            .unwrap()
            .is_none()
    );
    assert!(f.logs.find_by_user(f.smith, 10).await.unwrap().is_empty());
    let group = f.groups.find_by_name("group name").await.unwrap().unwrap();
    assert_eq!(group.member_count, 0);

    // Jones is untouched.
    assert_eq!(f.logs.find_by_user(f.jones, 10).await.unwrap().len(), 2);
}
