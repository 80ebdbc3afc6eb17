//! SQLite implementation of the database traits.
//!
//! This module provides a SQLx-backed implementation of the repository
//! traits defined in the parent module.

mod category;
mod connection;
mod task;
mod token;
mod user;

#[cfg(test)]
mod category_test;

pub use category::SqliteCategoryRepository;
pub use connection::SqliteDatabase;
pub use task::SqliteTaskRepository;
pub use token::SqliteTokenRepository;
pub use user::SqliteUserRepository;
