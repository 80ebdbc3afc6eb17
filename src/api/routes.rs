//! API route configuration.

use axum::Router;
use axum::routing::{delete, get, post};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use super::handlers::{self, HealthResponse, McpInfoResponse, TransportInfo};
use super::state::AppState;
use crate::db::Database;
use crate::mcp::transport::{sse, streamable};

/// Build routes with generic database type.
///
/// This macro reduces boilerplate when registering handlers that are generic
/// over the Database trait. It applies the turbofish operator automatically.
/// Repeating a path adds another method to the same route.
macro_rules! routes {
    ($D:ty => {
        $($method:ident $path:literal => $($handler:ident)::+),* $(,)?
    }) => {{
        let router = Router::new();
        $(
            let router = router.route($path, $method($($handler)::+::<$D>));
        )*
        router
    }};
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Taskhub MCP",
        description = "MCP server for tasks and categories. \
            The MCP transports themselves (/mcp, /mcp/sse, /mcp/messages) speak JSON-RPC \
            and are not described here.",
        license(name = "GPL-2.0")
    ),
    paths(handlers::root, handlers::health, handlers::mcp_info),
    components(schemas(HealthResponse, McpInfoResponse, TransportInfo)),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "mcp", description = "MCP server description")
    )
)]
pub struct ApiDoc;

/// Create the router: system routes, both MCP transports and API docs.
pub fn create_router<D: Database + 'static>(state: AppState<D>) -> Router {
    let api = ApiDoc::openapi();

    // System routes
    let system_routes = Router::new().route("/", get(handlers::root)).merge(routes!(D => {
        get "/health" => handlers::health,
        get "/mcp/info" => handlers::mcp_info,
    }));

    // Legacy HTTP+SSE transport
    let sse_routes = routes!(D => {
        get "/mcp/sse" => sse::connect,
        post "/mcp/messages" => sse::post_message,
    });

    // Streamable HTTP transport
    let streamable_routes = routes!(D => {
        post "/mcp" => streamable::post,
        get "/mcp" => streamable::listen,
        delete "/mcp" => streamable::close,
    });

    system_routes
        .merge(sse_routes)
        .merge(streamable_routes)
        .merge(Scalar::with_url("/docs", api))
        .with_state(state)
}
