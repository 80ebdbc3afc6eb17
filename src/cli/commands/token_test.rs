use std::sync::Arc;

use serde_json::Value;

use crate::auth::{AuthError, Authenticator, Capabilities, LoginKeys};
use crate::cli::commands::token::{
    Grant, create_token, list_tokens, login_token, permissions_from, revoke_token,
};
use crate::cli::commands::user::{add_user, set_user_active};
use crate::cli::error::CliError;
use crate::db::{Database, SqliteDatabase, TokenPermissions};

async fn setup() -> (Arc<SqliteDatabase>, Authenticator<SqliteDatabase>) {
    let db = SqliteDatabase::in_memory().await.unwrap();
    db.migrate().await.unwrap();
    add_user(&db, "alice", None).await.unwrap();
    let db = Arc::new(db);
    let authenticator = Authenticator::new(db.clone(), Some(LoginKeys::from_secret("cli-secret")));
    (db, authenticator)
}

/// Pull the raw token out of `create_token` output.
fn raw_token(output: &str) -> &str {
    output
        .lines()
        .find(|line| line.starts_with("pat_"))
        .expect("output contains the raw token")
}

#[test]
fn test_permissions_from_grants() {
    assert_eq!(permissions_from(&[]), TokenPermissions::default());
    assert_eq!(permissions_from(&[Grant::All]), TokenPermissions::all());

    let perms = permissions_from(&[Grant::CreateTasks, Grant::ReadTasks]);
    assert!(perms.can_read_tasks);
    assert!(perms.can_create_tasks);
    assert!(!perms.can_update_tasks);
    assert!(!perms.can_delete_tasks);
    assert!(!perms.can_read_categories);
    assert!(!perms.can_create_categories);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_created_token_authenticates_with_its_grants() {
    let (db, authenticator) = setup().await;

    let output = create_token(
        &authenticator,
        &*db,
        "alice",
        "laptop",
        &[Grant::ReadTasks, Grant::DeleteTasks],
        None,
    )
    .await
    .unwrap();
    assert!(output.contains("'laptop'"));

    let principal = authenticator
        .authenticate(Some(raw_token(&output)), None)
        .await
        .unwrap();
    assert_eq!(principal.username, "alice");
    match principal.capabilities {
        Capabilities::Scoped(perms) => {
            assert!(perms.can_read_tasks);
            assert!(perms.can_delete_tasks);
            assert!(!perms.can_create_tasks);
        }
        Capabilities::Full => panic!("scoped token granted full access"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_token_validation() {
    let (db, authenticator) = setup().await;

    let result = create_token(&authenticator, &*db, "ghost", "x", &[], None).await;
    assert!(matches!(result, Err(CliError::UserNotFound { .. })));

    let result = create_token(&authenticator, &*db, "alice", "x", &[], Some(0)).await;
    assert!(matches!(result, Err(CliError::InvalidInput { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_tokens_formats() {
    let (db, authenticator) = setup().await;

    let empty = list_tokens(&*db, "alice", "table").await.unwrap();
    assert_eq!(empty, "No tokens for alice.");

    create_token(&authenticator, &*db, "alice", "ci", &[], Some(30))
        .await
        .unwrap();

    let table = list_tokens(&*db, "alice", "table").await.unwrap();
    assert!(table.contains("ci"));
    assert!(table.contains("read-tasks, read-categories"));

    let json: Value = serde_json::from_str(&list_tokens(&*db, "alice", "json").await.unwrap())
        .unwrap();
    let tokens = json.as_array().unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0]["name"], "ci");
    assert_eq!(tokens[0]["permissions"]["canReadTasks"], true);
    assert!(tokens[0]["expiresAt"].is_string());
    // Hashes never leave the database.
    assert!(tokens[0].get("tokenHash").is_none());

    let result = list_tokens(&*db, "alice", "yaml").await;
    assert!(matches!(result, Err(CliError::InvalidInput { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_revoked_token_stops_authenticating() {
    let (db, authenticator) = setup().await;
    let output = create_token(&authenticator, &*db, "alice", "temp", &[Grant::All], None)
        .await
        .unwrap();
    let raw = raw_token(&output).to_string();

    let json: Value = serde_json::from_str(&list_tokens(&*db, "alice", "json").await.unwrap())
        .unwrap();
    let token_id = json[0]["id"].as_str().unwrap().to_string();

    revoke_token(&*db, "alice", &token_id).await.unwrap();
    let result = authenticator.authenticate(Some(&raw), None).await;
    assert!(matches!(result, Err(AuthError::Revoked)));

    let result = revoke_token(&*db, "alice", "nope0000").await;
    assert!(matches!(result, Err(CliError::Database(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_token() {
    let (db, authenticator) = setup().await;
    let keys = LoginKeys::from_secret("cli-secret");

    let jwt = login_token(&keys, &*db, "alice", 2).await.unwrap();
    let principal = authenticator.authenticate(Some(&jwt), None).await.unwrap();
    assert_eq!(principal.username, "alice");
    assert_eq!(principal.capabilities, Capabilities::Full);

    let result = login_token(&keys, &*db, "alice", 0).await;
    assert!(matches!(result, Err(CliError::InvalidInput { .. })));

    set_user_active(&*db, "alice", false).await.unwrap();
    let result = login_token(&keys, &*db, "alice", 2).await;
    assert!(matches!(result, Err(CliError::InvalidInput { .. })));
}
