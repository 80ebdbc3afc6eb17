//! Tests for the per-session protocol handler.

use std::sync::Arc;

use rmcp::model::ErrorCode;
use serde_json::{Value, json};

use crate::auth::{Capabilities, Principal};
use crate::db::{Database, SqliteDatabase, TaskRepository, TokenPermissions, User, UserRepository};
use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::{Incoming, JsonRpcResponse};
use crate::mcp::tools::ToolRegistry;

async fn handler(capabilities: Capabilities) -> (Arc<SqliteDatabase>, McpHandler<SqliteDatabase>) {
    let db = SqliteDatabase::in_memory().await.unwrap();
    db.migrate().await.unwrap();
    db.users()
        .create(&User {
            id: "user0001".to_string(),
            username: "alice".to_string(),
            email: None,
            is_active: true,
            created_at: String::new(),
        })
        .await
        .unwrap();

    let db = Arc::new(db);
    let principal = Principal {
        user_id: "user0001".to_string(),
        username: "alice".to_string(),
        is_active: true,
        capabilities,
        token_id: None,
    };
    let handler = McpHandler::new(Arc::clone(&db), Arc::new(ToolRegistry::new()), principal);
    (db, handler)
}

fn request(id: i64, method: &str, params: Option<Value>) -> Incoming {
    Incoming::Request {
        id: json!(id),
        method: method.to_string(),
        params,
    }
}

async fn call(handler: &McpHandler<SqliteDatabase>, method: &str, params: Value) -> JsonRpcResponse {
    handler
        .handle(request(1, method, Some(params)))
        .await
        .expect("requests always get a response")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_initialize() {
    let (_db, handler) = handler(Capabilities::Full).await;
    let response = call(
        &handler,
        "initialize",
        json!({ "protocolVersion": "2024-11-05", "clientInfo": { "name": "test-client" } }),
    )
    .await;

    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "taskhub-mcp");
    assert!(!handler.is_initialized());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_initialized_notification_has_no_response() {
    let (_db, handler) = handler(Capabilities::Full).await;
    let response = handler
        .handle(Incoming::Notification {
            method: "notifications/initialized".to_string(),
            params: None,
        })
        .await;
    assert!(response.is_none());
    assert!(handler.is_initialized());

    let other = handler
        .handle(Incoming::Notification {
            method: "notifications/cancelled".to_string(),
            params: Some(json!({ "requestId": 1 })),
        })
        .await;
    assert!(other.is_none());
    assert!(handler.handle(Incoming::Response).await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ping_and_unknown_method() {
    let (_db, handler) = handler(Capabilities::Full).await;
    let pong = call(&handler, "ping", json!({})).await;
    assert_eq!(pong.result, Some(json!({})));
    assert_eq!(pong.id, json!(1));

    let missing = call(&handler, "resources/list", json!({})).await;
    assert!(missing.result.is_none());
    assert_eq!(missing.error.unwrap().code, ErrorCode::METHOD_NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tools_list_ignores_capabilities() {
    let (_db, handler) = handler(Capabilities::Scoped(TokenPermissions::default())).await;
    let response = call(&handler, "tools/list", json!({})).await;
    let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
    assert_eq!(tools.len(), 9);
    assert!(tools.iter().any(|t| t["name"] == "tasks_delete"));
    assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tools_call_unknown_tool_is_tool_error() {
    let (_db, handler) = handler(Capabilities::Full).await;
    let response = call(&handler, "tools/call", json!({ "name": "tasks_explode" })).await;

    // Tool failures travel as successful JSON-RPC responses.
    assert!(response.error.is_none());
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    assert_eq!(result["content"][0]["text"], "Unknown tool: tasks_explode");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tools_call_invalid_params() {
    let (_db, handler) = handler(Capabilities::Full).await;

    let missing = handler.handle(request(2, "tools/call", None)).await.unwrap();
    assert_eq!(missing.error.unwrap().code, ErrorCode::INVALID_PARAMS);

    let no_name = call(&handler, "tools/call", json!({ "arguments": {} })).await;
    assert_eq!(no_name.error.unwrap().code, ErrorCode::INVALID_PARAMS);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tools_call_runs_tool() {
    let (db, handler) = handler(Capabilities::Full).await;
    let response = call(
        &handler,
        "tools/call",
        json!({ "name": "tasks_create", "arguments": { "title": "From the handler" } }),
    )
    .await;

    let result = response.result.unwrap();
    assert_ne!(result["isError"], true);
    let payload: Value =
        serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    let id = payload["task"]["id"].as_str().unwrap();
    let stored = db.tasks().get("user0001", id).await.unwrap();
    assert_eq!(stored.title, "From the handler");
}
