//! HTTP transport adapters.
//!
//! Two adapters feed the same [`McpHandler`](super::McpHandler):
//!
//! - [`sse`]: the legacy HTTP+SSE transport (`GET /mcp/sse` opens the stream,
//!   `POST /mcp/messages?sessionId=` delivers messages)
//! - [`streamable`]: the Streamable HTTP transport (`POST|GET|DELETE /mcp`,
//!   session id in the `mcp-session-id` header)
//!
//! Both authenticate every request independently and share the error
//! types defined here.

pub mod sse;
pub mod streamable;


use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::Json;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::sse::Event;
use axum::response::{IntoResponse, Response};
use miette::Diagnostic;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, warn};

use crate::api::AppState;
use crate::auth::{AuthError, Principal};
use crate::db::Database;

use rmcp::model::{ErrorCode, ErrorData};

use super::protocol::{DecodeError, JsonRpcResponse, SERVER_BUSY, SESSION_ERROR};
use super::session::{Session, SessionError};

/// Header carrying the Streamable HTTP session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Upper bound for a single JSON-RPC message body.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// A request-fatal transport failure. The session, if any, survives.
#[derive(Error, Diagnostic, Debug)]
pub enum TransportError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Auth(#[from] AuthError),

    #[error("Missing session id")]
    #[diagnostic(code(taskhub::transport::missing_session))]
    MissingSessionId,

    #[error("Session not found: {0}. Reconnect to /mcp/sse to open a new session")]
    #[diagnostic(code(taskhub::transport::stale_session))]
    StaleSession(String),

    #[error("Session not found: {0}")]
    #[diagnostic(code(taskhub::transport::session_not_found))]
    SessionNotFound(String),

    #[error("Session belongs to a different user")]
    #[diagnostic(code(taskhub::transport::session_mismatch))]
    SessionMismatch,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Capacity(#[from] SessionError),

    #[error("{}", .0.error.message)]
    #[diagnostic(code(taskhub::transport::decode))]
    Decode(DecodeError),

    #[error("A new session must start with an initialize request")]
    #[diagnostic(code(taskhub::transport::not_initialize))]
    NotInitialize,

    #[error("Failed to read request body: {0}")]
    #[diagnostic(code(taskhub::transport::body))]
    Body(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(taskhub::transport::internal))]
    Internal(String),
}

impl From<DecodeError> for TransportError {
    fn from(err: DecodeError) -> Self {
        TransportError::Decode(err)
    }
}

impl TransportError {
    pub fn status(&self) -> StatusCode {
        match self {
            TransportError::Auth(err) => err.status_code(),
            TransportError::MissingSessionId
            | TransportError::StaleSession(_)
            | TransportError::Decode(_)
            | TransportError::NotInitialize
            | TransportError::Body(_) => StatusCode::BAD_REQUEST,
            TransportError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            TransportError::SessionMismatch => StatusCode::FORBIDDEN,
            TransportError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
            TransportError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON-RPC error code used in Streamable HTTP envelopes.
    pub fn rpc_code(&self) -> ErrorCode {
        match self {
            TransportError::Auth(err) if err.status_code().is_server_error() => {
                ErrorCode::INTERNAL_ERROR
            }
            TransportError::Auth(_)
            | TransportError::StaleSession(_)
            | TransportError::SessionNotFound(_)
            | TransportError::SessionMismatch => SESSION_ERROR,
            TransportError::MissingSessionId
            | TransportError::NotInitialize
            | TransportError::Body(_) => ErrorCode::INVALID_REQUEST,
            TransportError::Capacity(_) => SERVER_BUSY,
            TransportError::Decode(err) => ErrorCode(err.error.code.0),
            TransportError::Internal(_) => ErrorCode::INTERNAL_ERROR,
        }
    }

    fn log(&self) {
        let status = self.status();
        if status.is_server_error() && !matches!(self, TransportError::Capacity(_)) {
            error!(error = %self, "Transport failure");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
    }
}

/// Plain `{ "error": … }` body, used by the SSE transport.
impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        self.log();
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// A [`TransportError`] rendered as a JSON-RPC error envelope.
#[derive(Debug)]
pub struct RpcFailure(pub TransportError);

impl From<TransportError> for RpcFailure {
    fn from(err: TransportError) -> Self {
        RpcFailure(err)
    }
}

impl IntoResponse for RpcFailure {
    fn into_response(self) -> Response {
        let err = self.0;
        err.log();
        let id = match &err {
            TransportError::Decode(decode) => decode.id.clone(),
            _ => Value::Null,
        };
        let body = JsonRpcResponse::error(id, ErrorData::new(err.rpc_code(), err.to_string(), None));
        (err.status(), Json(body)).into_response()
    }
}

/// Extract the bearer credential from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
}

/// Remote address, when the server was started with connect info.
pub fn peer_ip(request: &Request) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Authenticate the bearer credential of one request.
pub async fn authenticate<D: Database + 'static>(
    state: &AppState<D>,
    headers: &HeaderMap,
    origin: Option<IpAddr>,
) -> Result<Principal, TransportError> {
    let principal = state
        .authenticator()
        .authenticate(bearer_token(headers), origin)
        .await?;
    Ok(principal)
}

/// Reject a request whose principal is not the session owner.
pub fn ensure_owner<D: Database + 'static>(
    session: &Session<D>,
    principal: &Principal,
) -> Result<(), TransportError> {
    if principal.same_user(session.principal()) {
        Ok(())
    } else {
        warn!(
            session = %session.id(),
            owner = %session.principal().user_id,
            caller = %principal.user_id,
            "Session principal mismatch"
        );
        Err(TransportError::SessionMismatch)
    }
}

pub async fn read_body(request: Request) -> Result<Bytes, TransportError> {
    axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| TransportError::Body(e.to_string()))
}

/// Render one server message as an SSE `message` event.
fn message_event(message: &JsonRpcResponse) -> Result<Event, Infallible> {
    let data = serde_json::to_string(message).unwrap_or_else(|e| {
        error!(error = %e, "Failed to serialize server message");
        String::from("{}")
    });
    Ok(Event::default().event("message").data(data))
}
