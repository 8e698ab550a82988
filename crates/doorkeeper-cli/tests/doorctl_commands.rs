//! `doorctl` subcommands parsed with clap and run against an in-memory store.

use clap::Parser;
use doorkeeper_cli::OutputFormat;
use doorkeeper_cli::commands::auth::{AuthCommand, check};
use doorkeeper_cli::commands::{Admin, AdminCommand, exit_code};
use doorkeeper_core::{CardUid, LogKind};
use doorkeeper_storage::{AccessLogRepository, Database, KeyRepository, UserRepository};

#[derive(Debug, Parser)]
struct Doorctl {
    #[command(subcommand)]
    command: AdminCommand,
}

fn parse(args: &[&str]) -> AdminCommand {
    Doorctl::try_parse_from(std::iter::once("doorctl").chain(args.iter().copied()))
        .unwrap()
        .command
}

async fn run(admin: &Admin, args: &[&str]) -> anyhow::Result<()> {
    parse(args).execute(admin).await
}

async fn admin() -> Admin {
    Admin::new(Database::in_memory().await.unwrap(), OutputFormat::Human)
}

#[tokio::test]
async fn test_member_setup_grants_tag() {
    let admin = admin().await;

    run(&admin, &["user", "add", "ada@example.org", "Ada", "Lovelace"]).await.unwrap();
    run(&admin, &["key", "bind", "ada@example.org", "04:A1:B2:C3"]).await.unwrap();
    run(&admin, &["tag", "add", "front-door"]).await.unwrap();
    run(&admin, &["group", "add", "members", "-d", "paying members"]).await.unwrap();
    run(&admin, &["group", "authorize", "members", "front-door"]).await.unwrap();
    run(&admin, &["group", "join", "members", "ada@example.org"]).await.unwrap();

    let AdminCommand::Auth(AuthCommand::Check(args)) =
        parse(&["auth", "check", "--key", "04a1b2c3", "--tag", "front-door"])
    else {
        panic!("expected auth check");
    };
    assert!(check(&admin, &args).await.unwrap());

    // Binding activated the member; deactivating revokes the tag.
    run(&admin, &["user", "update", "ada@example.org", "status=inactive"]).await.unwrap();
    assert!(!check(&admin, &args).await.unwrap());

    run(&admin, &["group", "list"]).await.unwrap();
    run(&admin, &["user", "search", "group:members", "ada"]).await.unwrap();
}

#[tokio::test]
async fn test_key_conflict_exit_code() {
    let admin = admin().await;
    run(&admin, &["user", "add", "a@example.org", "A", "One"]).await.unwrap();
    run(&admin, &["user", "add", "b@example.org", "B", "Two"]).await.unwrap();
    run(&admin, &["key", "bind", "a@example.org", "04aabbcc"]).await.unwrap();

    let err = run(&admin, &["key", "bind", "b@example.org", "04aabbcc"]).await.unwrap_err();
    assert_eq!(exit_code(&err), 2);

    run(&admin, &["key", "bind", "--steal", "b@example.org", "04aabbcc"]).await.unwrap();
    let uid = CardUid::parse("04aabbcc").unwrap();
    let owner = admin.keys().find_owner(&uid).await.unwrap();
    let b = admin.find_user("b@example.org").await.unwrap();
    assert_eq!(owner, Some(b.id));
}

#[tokio::test]
async fn test_unknown_records_exit_code() {
    let admin = admin().await;

    let err = run(&admin, &["user", "show", "ghost@example.org"]).await.unwrap_err();
    assert_eq!(exit_code(&err), 3);

    let err = run(&admin, &["group", "delete", "nobody"]).await.unwrap_err();
    assert_eq!(exit_code(&err), 3);
}

#[tokio::test]
async fn test_invalid_status_leaves_user_unchanged() {
    let admin = admin().await;
    run(&admin, &["user", "add", "c@example.org", "C", "Three"]).await.unwrap();

    let err = run(&admin, &["user", "update", "c@example.org", "status=banished"])
        .await
        .unwrap_err();
    assert_eq!(exit_code(&err), 1);

    let user = admin.find_user("c@example.org").await.unwrap();
    assert_eq!(user.status, "inactive");
}

#[tokio::test]
async fn test_unbind_someone_elses_key() {
    let admin = admin().await;
    run(&admin, &["user", "add", "a@example.org", "A", "One"]).await.unwrap();
    run(&admin, &["user", "add", "b@example.org", "B", "Two"]).await.unwrap();
    run(&admin, &["key", "bind", "a@example.org", "04aabbcc"]).await.unwrap();

    let err = run(&admin, &["key", "unbind", "b@example.org", "04aabbcc"]).await.unwrap_err();
    assert_eq!(exit_code(&err), 3);

    run(&admin, &["key", "unbind", "a@example.org", "04aabbcc"]).await.unwrap();
    let a = admin.find_user("a@example.org").await.unwrap();
    assert!(admin.keys().list_for_user(a.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_log_add_and_filter() {
    let admin = admin().await;
    run(&admin, &["user", "add", "d@example.org", "D", "Four"]).await.unwrap();
    run(&admin, &["log", "add", "--kind", "message", "--message", "door serviced"]).await.unwrap();
    run(
        &admin,
        &["log", "add", "--kind", "error", "--message", "reader jammed", "--user", "d@example.org"],
    )
    .await
    .unwrap();
    run(&admin, &["log", "list", "--kind", "error", "--limit", "5"]).await.unwrap();

    let logs = admin.logs();
    assert_eq!(logs.count_by_kind(LogKind::Message).await.unwrap(), 1);
    let d = admin.find_user("d@example.org").await.unwrap();
    let entries = logs.find_by_user(d.id, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message.as_deref(), Some("reader jammed"));
}

#[tokio::test]
async fn test_delete_user() {
    let admin = admin().await;
    run(&admin, &["user", "add", "e@example.org", "E", "Five"]).await.unwrap();
    run(&admin, &["user", "delete", "e@example.org"]).await.unwrap();
    assert!(admin.users().find_by_email("e@example.org").await.unwrap().is_none());
}

#[test]
fn test_parse_errors() {
    let no_subject = ["doorctl", "auth", "check", "--tag", "front-door"];
    assert!(Doorctl::try_parse_from(no_subject).is_err());

    let bad_kind = ["doorctl", "log", "add", "--kind", "open", "--message", "x"];
    assert!(Doorctl::try_parse_from(bad_kind).is_err());

    let bad_uid = ["doorctl", "key", "bind", "1", "xyz"];
    assert!(Doorctl::try_parse_from(bad_uid).is_err());

    let no_assignments = ["doorctl", "user", "update", "1"];
    assert!(Doorctl::try_parse_from(no_assignments).is_err());
}
