//! Legacy HTTP+SSE transport.
//!
//! `GET /mcp/sse` authenticates, opens a session and answers with an event
//! stream whose first event names the message endpoint. Messages are then
//! POSTed to `/mcp/messages?sessionId=<id>` and their responses are pushed
//! back on the stream. The session lives exactly as long as the stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::api::AppState;
use crate::db::Database;
use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::decode;
use crate::mcp::session::{PushReceiver, TransportKind};

use super::{TransportError, authenticate, ensure_owner, message_event, peer_ip, read_body};

pub const STREAM_PATH: &str = "/mcp/sse";
pub const MESSAGES_PATH: &str = "/mcp/messages";

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Removes the session when the stream is dropped.
struct StreamGuard<D: Database + 'static> {
    state: AppState<D>,
    session_id: String,
}

impl<D: Database + 'static> Drop for StreamGuard<D> {
    fn drop(&mut self) {
        debug!(session = %self.session_id, "SSE stream dropped");
        self.state.sessions().remove(&self.session_id);
    }
}

/// `GET /mcp/sse`
#[instrument(skip_all)]
pub async fn connect<D: Database + 'static>(
    State(state): State<AppState<D>>,
    request: Request,
) -> Result<Response, TransportError> {
    let principal = authenticate(&state, request.headers(), peer_ip(&request)).await?;

    let handler = McpHandler::new(state.db_arc(), Arc::clone(state.tools()), principal);
    let session = state.sessions().create(TransportKind::Sse, handler)?;
    let receiver = session.open_stream();

    let endpoint = format!("{MESSAGES_PATH}?sessionId={}", session.id());
    let guard = StreamGuard {
        state: state.clone(),
        session_id: session.id().to_string(),
    };

    let closed = session.cancellation().clone().cancelled_owned();
    let shutdown = state.shutdown().clone().cancelled_owned();
    let stream = event_stream(endpoint, receiver, guard).take_until(async move {
        tokio::select! {
            _ = closed => {}
            _ = shutdown => {}
        }
    });

    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(state.keep_alive()))
        .into_response())
}

/// The endpoint event followed by every pushed message.
fn event_stream<D: Database + 'static>(
    endpoint: String,
    receiver: PushReceiver,
    guard: StreamGuard<D>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let first = stream::once(async move { Ok(Event::default().event("endpoint").data(endpoint)) });

    let messages = stream::unfold((receiver, guard), |(mut receiver, guard)| async move {
        let message = receiver.recv().await?;
        Some((message_event(&message), (receiver, guard)))
    });

    first.chain(messages)
}

/// `POST /mcp/messages?sessionId=<id>`
#[instrument(skip_all)]
pub async fn post_message<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Query(query): Query<MessagesQuery>,
    request: Request,
) -> Result<StatusCode, TransportError> {
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or(TransportError::MissingSessionId)?;

    let principal = authenticate(&state, request.headers(), peer_ip(&request)).await?;

    // Never create a session here: the client has to reconnect the stream.
    let session = state
        .sessions()
        .get(&session_id)
        .filter(|s| s.kind() == TransportKind::Sse)
        .ok_or(TransportError::StaleSession(session_id))?;
    ensure_owner(&session, &principal)?;

    let body = read_body(request).await?;
    let message = match decode(&body) {
        Ok(message) => message,
        Err(err) if err.is_parse_error() => return Err(err.into()),
        Err(err) => {
            // Structurally invalid JSON-RPC is answered on the stream.
            session.push(err.into_response());
            return Ok(StatusCode::ACCEPTED);
        }
    };

    session.touch();
    let _turn = session.turn().await;
    if session.is_closed() {
        return Err(TransportError::StaleSession(session.id().to_string()));
    }

    if let Some(response) = session.handler().handle(message).await {
        if !session.push(response) {
            debug!(session = %session.id(), "Stream closed, response dropped");
        }
    }
    session.touch();

    Ok(StatusCode::ACCEPTED)
}
