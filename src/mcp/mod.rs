//! Model Context Protocol (MCP) server.
//!
//! # Layout
//!
//! - **protocol**: JSON-RPC 2.0 message types and decoding
//! - **handler**: per-session protocol core (`initialize`, `tools/list`,
//!   `tools/call`, ...)
//! - **tools**: static dispatch table of task and category tools
//! - **session**: registry of live sessions shared by both transports
//! - **transport**: legacy SSE and Streamable HTTP adapters
//!
//! Every component is generic over `D: Database`.

pub mod handler;
pub mod protocol;
pub mod session;
pub mod tools;
pub mod transport;

#[cfg(test)]
mod handler_test;
#[cfg(test)]
mod protocol_test;

pub use handler::McpHandler;
pub use protocol::{Incoming, JsonRpcResponse, PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION};
pub use session::{Session, SessionError, SessionRegistry, TransportKind};
pub use tools::{ToolError, ToolRegistry};
pub use transport::{RpcFailure, SESSION_HEADER, TransportError};
