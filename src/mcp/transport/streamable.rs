//! Streamable HTTP transport.
//!
//! One endpoint, three verbs, correlated by the `mcp-session-id` header:
//!
//! - `POST` without a session id must carry `initialize` and opens a session;
//!   with a session id it delivers a message to that session
//! - `GET` opens the session's server-push stream
//! - `DELETE` closes the session
//!
//! Failures are answered with a JSON-RPC error envelope.

use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::stream::{self, Stream, StreamExt};
use tracing::{debug, info, instrument};

use crate::api::AppState;
use crate::db::Database;
use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::{JsonRpcResponse, decode};
use crate::mcp::session::{PushReceiver, Session, TransportKind};

use super::{
    RpcFailure, SESSION_HEADER, TransportError, authenticate, ensure_owner, message_event,
    peer_ip, read_body,
};

pub const ENDPOINT_PATH: &str = "/mcp";

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Look up a session and check that the caller owns it.
async fn resolve<D: Database + 'static>(
    state: &AppState<D>,
    headers: &HeaderMap,
    origin: Option<IpAddr>,
) -> Result<Arc<Session<D>>, TransportError> {
    let id = session_id(headers).ok_or(TransportError::MissingSessionId)?;
    let principal = authenticate(state, headers, origin).await?;
    // Sessions opened by the SSE transport are not addressable here.
    let session = state
        .sessions()
        .get(&id)
        .filter(|s| s.kind() == TransportKind::StreamableHttp)
        .ok_or(TransportError::SessionNotFound(id))?;
    ensure_owner(&session, &principal)?;
    Ok(session)
}

fn json_response(
    status: StatusCode,
    session_id: &str,
    body: Option<JsonRpcResponse>,
) -> Result<Response, TransportError> {
    let value = HeaderValue::from_str(session_id)
        .map_err(|e| TransportError::Internal(e.to_string()))?;
    let header = [(HeaderName::from_static(SESSION_HEADER), value)];
    Ok(match body {
        Some(body) => (status, header, Json(body)).into_response(),
        None => (status, header).into_response(),
    })
}

/// `POST /mcp`
#[instrument(skip_all)]
pub async fn post<D: Database + 'static>(
    State(state): State<AppState<D>>,
    request: Request,
) -> Result<Response, RpcFailure> {
    match session_id(request.headers()) {
        None => open_session(state, request).await.map_err(RpcFailure),
        Some(_) => deliver(state, request).await.map_err(RpcFailure),
    }
}

async fn open_session<D: Database + 'static>(
    state: AppState<D>,
    request: Request,
) -> Result<Response, TransportError> {
    let principal = authenticate(&state, request.headers(), peer_ip(&request)).await?;

    let body = read_body(request).await?;
    let message = decode(&body)?;
    if !message.is_initialize() {
        return Err(TransportError::NotInitialize);
    }

    let handler = McpHandler::new(state.db_arc(), Arc::clone(state.tools()), principal);
    let session = state
        .sessions()
        .create(TransportKind::StreamableHttp, handler)?;

    let _turn = session.turn().await;
    let response = session.handler().handle(message).await;
    session.touch();
    json_response(StatusCode::OK, session.id(), response)
}

async fn deliver<D: Database + 'static>(
    state: AppState<D>,
    request: Request,
) -> Result<Response, TransportError> {
    let session = resolve(&state, request.headers(), peer_ip(&request)).await?;

    let body = read_body(request).await?;
    let message = decode(&body)?;

    session.touch();
    let _turn = session.turn().await;
    if session.is_closed() {
        return Err(TransportError::SessionNotFound(session.id().to_string()));
    }
    let response = session.handler().handle(message).await;
    session.touch();

    match response {
        Some(response) => json_response(StatusCode::OK, session.id(), Some(response)),
        None => json_response(StatusCode::ACCEPTED, session.id(), None),
    }
}

/// `GET /mcp`
#[instrument(skip_all)]
pub async fn listen<D: Database + 'static>(
    State(state): State<AppState<D>>,
    request: Request,
) -> Result<Response, RpcFailure> {
    let session = resolve(&state, request.headers(), peer_ip(&request)).await?;
    debug!(session = %session.id(), "Opening push stream");

    // Replaces any earlier stream for this session.
    let receiver = session.open_stream();
    session.touch();

    let closed = session.cancellation().clone().cancelled_owned();
    let shutdown = state.shutdown().clone().cancelled_owned();
    let stream = push_stream(receiver).take_until(async move {
        tokio::select! {
            _ = closed => {}
            _ = shutdown => {}
        }
    });

    let mut response = Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(state.keep_alive()))
        .into_response();
    if let Ok(value) = HeaderValue::from_str(session.id()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(SESSION_HEADER), value);
    }
    Ok(response)
}

fn push_stream(receiver: PushReceiver) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    stream::unfold(receiver, |mut receiver| async move {
        let message = receiver.recv().await?;
        Some((message_event(&message), receiver))
    })
}

/// `DELETE /mcp`
#[instrument(skip_all)]
pub async fn close<D: Database + 'static>(
    State(state): State<AppState<D>>,
    request: Request,
) -> Result<StatusCode, RpcFailure> {
    let session = resolve(&state, request.headers(), peer_ip(&request)).await?;

    // Let an in-flight exchange finish before tearing down.
    let _turn = session.turn().await;
    state.sessions().remove(session.id());
    info!(session = %session.id(), "Session deleted by client");

    Ok(StatusCode::OK)
}
