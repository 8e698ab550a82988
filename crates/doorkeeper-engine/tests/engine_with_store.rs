//! Access cycles against a real SQLite credential store.

use doorkeeper_core::{CardUid, LogKind};
use doorkeeper_engine::{AccessEngine, CycleOutcome, DenyReason, EngineConfig};
use doorkeeper_hardware::mock::MockDoor;
use doorkeeper_storage::{
    AccessLogRepository, CredentialStore, Database, NewUser, SqliteAccessLogRepository,
    SqliteCredentialStore, SqliteUserRepository, UserField, UserRepository, UserUpdate,
};

fn fast_config() -> EngineConfig {
    EngineConfig {
        read_attempts: 1,
        unlock_hold_secs: 0,
        blink_period_ms: 0,
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn test_enrolled_card_opens_until_user_deactivated() {
    let db = Database::in_memory().await.unwrap();
    let users = SqliteUserRepository::new(db.pool().clone());
    let logs = SqliteAccessLogRepository::new(db.pool().clone());
    let store = SqliteCredentialStore::from_database(db);

    let uid = CardUid::parse("04:A1:B2:C3").unwrap();
    let user = users
        .create(&NewUser::new("ada@example.org", "Ada", "Lovelace"))
        .await
        .unwrap();
    store.bind_key(&uid, user, false).await.unwrap();

    let (door, handle) = MockDoor::new();
    let mut engine = AccessEngine::new(door, store, fast_config());

    handle.present_card(uid.clone()).await.unwrap();
    let report = engine.run_cycle().await.unwrap();
    assert_eq!(
        report.outcome,
        CycleOutcome::Unlocked {
            uid: uid.clone(),
            user_id: user
        }
    );

    let update = UserUpdate::new().set(UserField::Status, "inactive").unwrap();
    users.update(user, &update).await.unwrap();

    handle.present_card(uid.clone()).await.unwrap();
    let report = engine.run_cycle().await.unwrap();
    assert_eq!(
        report.outcome,
        CycleOutcome::Denied {
            uid: uid.clone(),
            user_id: Some(user),
            reason: DenyReason::InactiveUser
        }
    );

    let kinds: Vec<LogKind> = logs
        .find_by_key(&uid, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds, vec![LogKind::Deny, LogKind::Unlock, LogKind::Assign]);
}

#[tokio::test]
async fn test_unknown_card_logged_without_user() {
    let db = Database::in_memory().await.unwrap();
    let logs = SqliteAccessLogRepository::new(db.pool().clone());
    let store = SqliteCredentialStore::from_database(db);

    let (door, handle) = MockDoor::new();
    let mut engine = AccessEngine::new(door, store, fast_config());

    let uid = CardUid::parse("deadbeef").unwrap();
    handle.present_card(uid.clone()).await.unwrap();
    engine.run_cycle().await.unwrap();

    let entries = logs.recent(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, LogKind::Deny);
    assert_eq!(entries[0].key_uid, Some(uid));
    assert_eq!(entries[0].user_id, None);
    assert_eq!(entries[0].message.as_deref(), Some("card not registered"));
}
