use tempfile::TempDir;

use crate::cli::commands::serve::open_database;
use crate::db::{Database, User, UserRepository};

#[tokio::test(flavor = "multi_thread")]
async fn test_open_database_creates_parent_and_migrates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("data").join("taskhub.db");

    let db = open_database(&path).await.unwrap();
    assert!(path.exists());

    db.users()
        .create(&User {
            id: String::new(),
            username: "carol".to_string(),
            email: None,
            is_active: true,
            created_at: String::new(),
        })
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_open_database_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taskhub.db");

    let first = open_database(&path).await.unwrap();
    first
        .users()
        .create(&User {
            id: String::new(),
            username: "dave".to_string(),
            email: None,
            is_active: true,
            created_at: String::new(),
        })
        .await
        .unwrap();
    drop(first);

    // Reopening runs migrations again without losing data.
    let second = open_database(&path).await.unwrap();
    let user = second.users().get_by_username("dave").await.unwrap();
    assert_eq!(user.username, "dave");
}
