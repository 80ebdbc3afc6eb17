//! Tests for task MCP tools.

use rmcp::model::{CallToolResult, RawContent};
use serde_json::{Value, json};

use crate::auth::{Capabilities, Principal};
use crate::db::{
    Category, CategoryRepository, Database, SqliteDatabase, TaskRepository, TaskStatus,
    TokenPermissions, User, UserRepository,
};
use crate::mcp::tools::ToolRegistry;

struct Fixture {
    db: SqliteDatabase,
    registry: ToolRegistry<SqliteDatabase>,
    alice: Principal,
}

impl Fixture {
    async fn new() -> Self {
        let db = SqliteDatabase::in_memory().await.unwrap();
        db.migrate().await.unwrap();
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
        Self {
            db,
            registry: ToolRegistry::new(),
            alice: principal("user0001", "alice", Capabilities::Full),
        }
    }

    async fn call_as(&self, who: &Principal, name: &str, args: Value) -> CallToolResult {
        self.registry.call(&self.db, who, name, Some(args)).await
    }

    async fn call(&self, name: &str, args: Value) -> CallToolResult {
        self.call_as(&self.alice, name, args).await
    }

    /// Call a tool expected to succeed and parse its JSON payload.
    async fn ok(&self, name: &str, args: Value) -> Value {
        let result = self.call(name, args).await;
        assert_ne!(result.is_error, Some(true), "{name} failed: {}", text(&result));
        serde_json::from_str(text(&result)).expect("tool output should be JSON")
    }

    async fn create_task(&self, title: &str) -> String {
        let out = self.ok("tasks_create", json!({ "title": title })).await;
        out["task"]["id"].as_str().unwrap().to_string()
    }
}

fn principal(user_id: &str, username: &str, capabilities: Capabilities) -> Principal {
    Principal {
        user_id: user_id.to_string(),
        username: username.to_string(),
        is_active: true,
        capabilities,
        token_id: None,
    }
}

fn text(result: &CallToolResult) -> &str {
    match &result.content[0].raw {
        RawContent::Text(text) => text.text.as_str(),
        other => panic!("expected text content, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_tasks_empty() {
    let fx = Fixture::new().await;
    let out = fx.ok("tasks_list", json!({})).await;
    assert_eq!(out["count"], 0);
    assert_eq!(out["tasks"], json!([]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_task_defaults_and_trimming() {
    let fx = Fixture::new().await;
    let out = fx
        .ok(
            "tasks_create",
            json!({ "title": "  Buy milk  ", "description": "   ", "dueDate": "2026-03-01" }),
        )
        .await;

    let task = &out["task"];
    assert_eq!(task["title"], "Buy milk");
    assert_eq!(task["description"], Value::Null);
    assert_eq!(task["priority"], "normal");
    assert_eq!(task["status"], "active");
    assert_eq!(task["dueDate"], "2026-03-01");
    assert!(task.get("userId").is_none());

    let id = task["id"].as_str().unwrap();
    let stored = fx.db.tasks().get("user0001", id).await.unwrap();
    assert_eq!(stored.title, "Buy milk");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_task_validation() {
    let fx = Fixture::new().await;

    let blank = fx.call("tasks_create", json!({ "title": "   " })).await;
    assert_eq!(blank.is_error, Some(true));
    assert_eq!(text(&blank), "Title is required");

    let missing = fx.call("tasks_create", json!({})).await;
    assert_eq!(missing.is_error, Some(true));
    assert!(text(&missing).starts_with("Invalid arguments:"));

    let bad_priority = fx
        .call("tasks_create", json!({ "title": "x", "priority": "urgent" }))
        .await;
    assert_eq!(bad_priority.is_error, Some(true));

    let bad_date = fx
        .call("tasks_create", json!({ "title": "x", "dueDate": "03/01/2026" }))
        .await;
    assert_eq!(bad_date.is_error, Some(true));
    assert!(text(&bad_date).contains("YYYY-MM-DD"));

    let bad_time = fx
        .call("tasks_create", json!({ "title": "x", "dueTime": "25:00" }))
        .await;
    assert_eq!(bad_time.is_error, Some(true));

    let foreign_category = fx
        .call("tasks_create", json!({ "title": "x", "categoryId": "nope0000" }))
        .await;
    assert_eq!(foreign_category.is_error, Some(true));
    assert!(text(&foreign_category).contains("Category not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_task_is_owner_scoped() {
    let fx = Fixture::new().await;
    let id = fx.create_task("Secret plan").await;

    let out = fx.ok("tasks_get", json!({ "taskId": id })).await;
    assert_eq!(out["title"], "Secret plan");
    assert_eq!(out["category"], Value::Null);

    let bob = principal("user0002", "bob", Capabilities::Full);
    let result = fx.call_as(&bob, "tasks_get", json!({ "taskId": id })).await;
    assert_eq!(result.is_error, Some(true));
    assert!(text(&result).contains("not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_tasks_with_filters_and_category() {
    let fx = Fixture::new().await;
    let category = fx
        .db
        .categories()
        .create(&Category {
            id: "cat00001".to_string(),
            user_id: "user0001".to_string(),
            name: "Home".to_string(),
            color: "#123456".to_string(),
            task_count: 0,
            created_at: String::new(),
        })
        .await
        .unwrap();

    fx.ok(
        "tasks_create",
        json!({ "title": "Fix sink", "categoryId": category.id, "priority": "high" }),
    )
    .await;
    fx.create_task("Read book").await;

    let out = fx.ok("tasks_list", json!({ "priority": "high" })).await;
    assert_eq!(out["count"], 1);
    let task = &out["tasks"][0];
    assert_eq!(task["title"], "Fix sink");
    assert_eq!(task["category"]["name"], "Home");
    assert_eq!(task["category"]["color"], "#123456");

    let out = fx.ok("tasks_list", json!({ "search": "BOOK" })).await;
    assert_eq!(out["count"], 1);
    assert_eq!(out["tasks"][0]["title"], "Read book");

    let out = fx
        .ok("tasks_list", json!({ "categoryId": "cat00001", "status": "active" }))
        .await;
    assert_eq!(out["count"], 1);

    let bad = fx.call("tasks_list", json!({ "status": "archived" })).await;
    assert_eq!(bad.is_error, Some(true));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_tasks_limit_is_capped() {
    let fx = Fixture::new().await;
    for i in 0..3 {
        fx.create_task(&format!("Task {i}")).await;
    }
    let out = fx.ok("tasks_list", json!({ "limit": 2 })).await;
    assert_eq!(out["count"], 2);
    let out = fx.ok("tasks_list", json!({ "limit": 1000 })).await;
    assert_eq!(out["count"], 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_task_partial() {
    let fx = Fixture::new().await;
    let created = fx
        .ok(
            "tasks_create",
            json!({ "title": "Draft", "description": "keep me", "dueTime": "08:15" }),
        )
        .await;
    let id = created["task"]["id"].as_str().unwrap().to_string();

    let out = fx
        .ok(
            "tasks_update",
            json!({ "taskId": id, "title": "Final", "priority": "low" }),
        )
        .await;
    assert_eq!(out["task"]["title"], "Final");
    assert_eq!(out["task"]["priority"], "low");
    // Untouched fields survive.
    assert_eq!(out["task"]["description"], "keep me");
    assert_eq!(out["task"]["dueTime"], "08:15");

    let blank = fx
        .call("tasks_update", json!({ "taskId": id, "title": "  " }))
        .await;
    assert_eq!(blank.is_error, Some(true));
    assert_eq!(text(&blank), "Title cannot be blank");

    let cleared = fx
        .ok("tasks_update", json!({ "taskId": id, "description": null, "dueTime": null }))
        .await;
    assert_eq!(cleared["task"]["description"], Value::Null);
    assert_eq!(cleared["task"]["dueTime"], Value::Null);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_task_category_null_clears() {
    let fx = Fixture::new().await;
    let cat = fx
        .ok("categories_create", json!({ "name": "Work" }))
        .await;
    let cat_id = cat["category"]["id"].as_str().unwrap().to_string();

    let id = fx.create_task("Report").await;
    let out = fx
        .ok("tasks_update", json!({ "taskId": id, "categoryId": cat_id }))
        .await;
    assert_eq!(out["task"]["categoryId"], cat_id.as_str());
    assert_eq!(out["task"]["category"]["name"], "Work");

    let out = fx
        .ok("tasks_update", json!({ "taskId": id, "categoryId": null }))
        .await;
    assert_eq!(out["task"]["categoryId"], Value::Null);

    let stored = fx.db.tasks().get("user0001", &id).await.unwrap();
    assert!(stored.category_id.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_complete_and_reopen() {
    let fx = Fixture::new().await;
    let id = fx.create_task("Ship it").await;

    let out = fx.ok("tasks_complete", json!({ "taskId": id })).await;
    assert_eq!(out["message"], "Task marked as completed");
    assert!(out["completedAt"].is_string());
    let stored = fx.db.tasks().get("user0001", &id).await.unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    assert!(stored.completed_at.is_some());

    // Completing twice is not an error.
    let again = fx.ok("tasks_complete", json!({ "taskId": id })).await;
    assert_eq!(again["message"], "Task is already completed");

    let out = fx.ok("tasks_reopen", json!({ "taskId": id })).await;
    assert_eq!(out["status"], "active");
    let stored = fx.db.tasks().get("user0001", &id).await.unwrap();
    assert_eq!(stored.status, TaskStatus::Active);
    assert!(stored.completed_at.is_none());

    let again = fx.ok("tasks_reopen", json!({ "taskId": id })).await;
    assert_eq!(again["message"], "Task is already active");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_task() {
    let fx = Fixture::new().await;
    let id = fx.create_task("Temporary").await;

    let out = fx.ok("tasks_delete", json!({ "taskId": id })).await;
    assert_eq!(out["taskId"], id.as_str());
    assert!(fx.db.tasks().get("user0001", &id).await.is_err());

    let missing = fx.call("tasks_delete", json!({ "taskId": id })).await;
    assert_eq!(missing.is_error, Some(true));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_without_permission_keeps_row() {
    let fx = Fixture::new().await;
    let id = fx.create_task("Precious").await;

    let scoped = principal(
        "user0001",
        "alice",
        Capabilities::Scoped(TokenPermissions {
            can_update_tasks: true,
            ..TokenPermissions::default()
        }),
    );
    let result = fx
        .call_as(&scoped, "tasks_delete", json!({ "taskId": id }))
        .await;
    assert_eq!(result.is_error, Some(true));
    assert_eq!(text(&result), "Permission denied: canDeleteTasks required");
    assert!(fx.db.tasks().get("user0001", &id).await.is_ok());

    // Read and update are allowed for the same principal.
    let read = fx
        .call_as(&scoped, "tasks_get", json!({ "taskId": id }))
        .await;
    assert_ne!(read.is_error, Some(true));
    let created = fx
        .call_as(&scoped, "tasks_create", json!({ "title": "nope" }))
        .await;
    assert_eq!(text(&created), "Permission denied: canCreateTasks required");
}
