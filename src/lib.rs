//! Taskhub: an MCP server for tasks and categories.
//!
//! Clients connect over the Streamable HTTP transport (`/mcp`) or the legacy
//! HTTP+SSE transport (`/mcp/sse`), authenticate with a bearer credential and
//! call task and category tools scoped to their account.

pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod mcp;
pub mod paths;
pub mod serde_utils;
