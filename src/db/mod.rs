//! Database abstraction layer.
//!
//! Trait-based abstractions for the data the MCP tools and the authenticator
//! read and write, so storage backends can be swapped without touching the
//! protocol layer.
//!
//! # Architecture
//!
//! - `error`: Storage-agnostic error types
//! - `models`: Domain entities (User, ApiToken, Task, Category)
//! - `repository`: Trait definitions for data access
//! - `sqlite`: SQLx-backed SQLite implementation

mod error;
mod models;
mod repository;
pub mod sqlite;
pub mod utils;


pub use error::{DbError, DbResult};
pub use models::*;
pub use repository::*;
pub use sqlite::SqliteDatabase;
