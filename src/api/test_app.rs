//! Router harness shared by HTTP-level tests.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::api::{AppState, create_router};
use crate::auth::LoginKeys;
use crate::db::{Database, SqliteDatabase, TokenPermissions, User, UserRepository};
use crate::mcp::SESSION_HEADER;

pub const ALICE: &str = "user0001";
pub const BOB: &str = "user0002";

pub struct TestApp {
    pub state: AppState<SqliteDatabase>,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_max_sessions(100).await
    }

    pub async fn with_max_sessions(max_sessions: usize) -> Self {
        let db = SqliteDatabase::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        for (id, username) in [(ALICE, "alice"), (BOB, "bob")] {
            db.users()
                .create(&User {
                    id: id.to_string(),
                    username: username.to_string(),
                    email: None,
                    is_active: true,
                    created_at: String::new(),
                })
                .await
                .unwrap();
        }

        let state = AppState::new(db, Some(LoginKeys::from_secret("test-secret")), max_sessions);
        let router = create_router(state.clone());
        Self { state, router }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// A full-access login token.
    pub fn login(&self, user_id: &str) -> String {
        self.state
            .authenticator()
            .login_keys()
            .unwrap()
            .issue(user_id, chrono::Duration::hours(1))
            .unwrap()
    }

    /// A scoped API token with the given permissions.
    pub async fn token(&self, user_id: &str, permissions: TokenPermissions) -> String {
        self.token_expiring(user_id, permissions, None).await
    }

    pub async fn token_expiring(
        &self,
        user_id: &str,
        permissions: TokenPermissions,
        expires_at: Option<&str>,
    ) -> String {
        self.state
            .authenticator()
            .issue_token(user_id, "test", permissions, expires_at.map(String::from))
            .await
            .unwrap()
            .raw
    }
}

/// Build a request. `body` is sent as JSON.
pub fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    session: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(session) = session {
        builder = builder.header(SESSION_HEADER, session);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn raw_post(uri: &str, token: &str, session: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(session) = session {
        builder = builder.header(SESSION_HEADER, session);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn rpc(id: i64, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

pub fn notification(method: &str) -> Value {
    json!({ "jsonrpc": "2.0", "method": method })
}

pub fn initialize(id: i64) -> Value {
    rpc(
        id,
        "initialize",
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0" }
        }),
    )
}

pub fn call_tool(id: i64, name: &str, arguments: Value) -> Value {
    rpc(id, "tools/call", json!({ "name": name, "arguments": arguments }))
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// The text of the first content item of a `tools/call` result.
pub fn tool_text(result: &Value) -> &str {
    result["content"][0]["text"].as_str().unwrap()
}

/// One server-sent event.
#[derive(Debug)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.data).unwrap()
    }
}

/// Read the next event from an SSE body. `None` when the stream ended.
pub async fn next_event(body: &mut Body) -> Option<SseEvent> {
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .expect("timed out waiting for an event")?
        .unwrap();
    let bytes = frame.into_data().unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    let mut event = None;
    let mut data = Vec::new();
    for line in text.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = Some(name.trim().to_string());
        } else if let Some(chunk) = line.strip_prefix("data:") {
            data.push(chunk.trim_start().to_string());
        }
    }
    Some(SseEvent {
        event,
        data: data.join("\n"),
    })
}
