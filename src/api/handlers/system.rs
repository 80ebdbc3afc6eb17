//! System health and status handlers.

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::db::Database;
use crate::mcp::transport::{SESSION_HEADER, sse, streamable};
use crate::mcp::{PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION, TransportKind};

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    #[schema(example = "ok")]
    pub status: String,
    /// Number of open MCP sessions
    #[schema(example = 2)]
    pub sessions: usize,
}

/// One supported MCP transport
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransportInfo {
    #[schema(example = "streamable-http")]
    pub name: String,
    /// Paths served by this transport
    pub endpoints: Vec<String>,
    /// Header or query parameter carrying the session id
    #[schema(example = "mcp-session-id")]
    pub session_id: String,
}

/// Static description of the MCP server
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct McpInfoResponse {
    #[schema(example = "taskhub-mcp")]
    pub name: String,
    pub version: String,
    #[schema(example = "2024-11-05")]
    pub protocol_version: String,
    pub transports: Vec<TransportInfo>,
    /// How clients authenticate
    #[schema(example = "Bearer token (API token or login token)")]
    pub authentication: String,
    /// Names of every tool, whatever the caller's permissions
    pub tools: Vec<String>,
}

/// Service banner
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Service name and version", body = String)
    )
)]
#[instrument]
pub async fn root() -> String {
    format!("{SERVER_NAME} {SERVER_VERSION}")
}

/// Health check endpoint
///
/// Returns the current health status and the number of open sessions
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Health check successful", body = HealthResponse)
    )
)]
#[instrument(skip(state))]
pub async fn health<D: Database + 'static>(
    State(state): State<AppState<D>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: state.sessions().len(),
    })
}

/// MCP server description
///
/// Unauthenticated. Lists transports, authentication scheme and tool names.
#[utoipa::path(
    get,
    path = "/mcp/info",
    tag = "mcp",
    responses(
        (status = 200, description = "Server description", body = McpInfoResponse)
    )
)]
#[instrument(skip(state))]
pub async fn mcp_info<D: Database + 'static>(
    State(state): State<AppState<D>>,
) -> Json<McpInfoResponse> {
    Json(McpInfoResponse {
        name: SERVER_NAME.to_string(),
        version: SERVER_VERSION.to_string(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        transports: vec![
            TransportInfo {
                name: TransportKind::StreamableHttp.to_string(),
                endpoints: vec![streamable::ENDPOINT_PATH.to_string()],
                session_id: SESSION_HEADER.to_string(),
            },
            TransportInfo {
                name: TransportKind::Sse.to_string(),
                endpoints: vec![
                    sse::STREAM_PATH.to_string(),
                    sse::MESSAGES_PATH.to_string(),
                ],
                session_id: "sessionId".to_string(),
            },
        ],
        authentication: "Bearer token (API token or login token)".to_string(),
        tools: state.tools().names(),
    })
}
