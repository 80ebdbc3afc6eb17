//! Tests for SqliteCategoryRepository.

use crate::db::{
    Category, CategoryRepository, Database, DbError, Priority, SqliteDatabase, Task,
    TaskRepository, TaskStatus, User, UserRepository,
};

async fn setup_db() -> SqliteDatabase {
    let db = SqliteDatabase::in_memory()
        .await
        .expect("Failed to create in-memory database");
    db.migrate().await.expect("Migration should succeed");
    for (id, name) in [("user0001", "alice"), ("user0002", "bob")] {
        db.users()
            .create(&User {
                id: id.to_string(),
                username: name.to_string(),
                email: None,
                is_active: true,
                created_at: String::new(),
            })
            .await
            .unwrap();
    }
    db
}

fn make_category(id: &str, user_id: &str, name: &str) -> Category {
    Category {
        id: id.to_string(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        color: "#6366f1".to_string(),
        task_count: 0,
        created_at: String::new(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn category_create_get_and_find_by_name() {
    let db = setup_db().await;
    let categories = db.categories();

    let created = categories
        .create(&make_category("cat00001", "user0001", "Work"))
        .await
        .unwrap();
    assert!(!created.created_at.is_empty());

    let fetched = categories.get("user0001", "cat00001").await.unwrap();
    assert_eq!(fetched.name, "Work");

    let by_name = categories.find_by_name("user0001", "WORK").await.unwrap();
    assert_eq!(by_name.map(|c| c.id).as_deref(), Some("cat00001"));

    assert!(
        categories
            .find_by_name("user0002", "Work")
            .await
            .unwrap()
            .is_none()
    );
    assert!(matches!(
        categories.get("user0002", "cat00001").await,
        Err(DbError::NotFound { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn category_names_are_unique_per_user_ignoring_case() {
    let db = setup_db().await;
    let categories = db.categories();

    categories
        .create(&make_category("cat00001", "user0001", "Work"))
        .await
        .unwrap();

    let dup = categories
        .create(&make_category("cat00002", "user0001", "work"))
        .await;
    assert!(matches!(dup, Err(DbError::Constraint { .. })));

    // Another user may reuse the name.
    categories
        .create(&make_category("cat00003", "user0002", "Work"))
        .await
        .expect("names are scoped per user");
}

#[tokio::test(flavor = "multi_thread")]
async fn category_list_is_sorted_with_task_counts() {
    let db = setup_db().await;
    let categories = db.categories();
    for (id, name) in [("cat0000b", "beta"), ("cat0000a", "Alpha"), ("cat0000c", "Gamma")] {
        categories
            .create(&make_category(id, "user0001", name))
            .await
            .unwrap();
    }
    categories
        .create(&make_category("cat0000x", "user0002", "Other"))
        .await
        .unwrap();

    let tasks = db.tasks();
    for id in ["task0001", "task0002"] {
        tasks
            .create(&Task {
                id: id.to_string(),
                user_id: "user0001".to_string(),
                title: id.to_string(),
                description: None,
                status: TaskStatus::Active,
                priority: Priority::Normal,
                due_date: None,
                due_time: None,
                category_id: Some("cat0000b".to_string()),
                completed_at: None,
                created_at: String::new(),
                updated_at: String::new(),
            })
            .await
            .unwrap();
    }

    let listed = categories.list("user0001").await.unwrap();
    let names: Vec<&str> = listed.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "beta", "Gamma"]);

    let beta = listed.iter().find(|c| c.id == "cat0000b").unwrap();
    assert_eq!(beta.task_count, 2);
    let alpha = listed.iter().find(|c| c.id == "cat0000a").unwrap();
    assert_eq!(alpha.task_count, 0);
}
