//! Repository traits for data access abstraction.
//!
//! These traits define the contract for data access, allowing different
//! storage backends to be swapped without changing the MCP layer. Every
//! method returns a `Send` future so repositories can be used from axum
//! handlers and spawned tasks.

use std::future::Future;

use crate::db::{
    DbResult,
    models::{ApiToken, Category, Task, TaskQuery, User},
};

/// Repository for user accounts.
pub trait UserRepository {
    /// Create a new user. An empty id is replaced by a generated one.
    fn create(&self, user: &User) -> impl Future<Output = DbResult<User>> + Send;

    /// Get a user by ID.
    fn get(&self, id: &str) -> impl Future<Output = DbResult<User>> + Send;

    /// Get a user by username.
    fn get_by_username(&self, username: &str) -> impl Future<Output = DbResult<User>> + Send;

    /// Enable or disable an account.
    fn set_active(&self, id: &str, active: bool) -> impl Future<Output = DbResult<()>> + Send;
}

/// Repository for scoped API tokens.
pub trait TokenRepository {
    /// Store a new token record.
    fn create(&self, token: &ApiToken) -> impl Future<Output = DbResult<ApiToken>> + Send;

    /// Look up a token by the hash of its raw value.
    fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = DbResult<Option<ApiToken>>> + Send;

    /// List a user's tokens, newest first.
    fn list_by_user(&self, user_id: &str) -> impl Future<Output = DbResult<Vec<ApiToken>>> + Send;

    /// Number of tokens owned by a user.
    fn count_by_user(&self, user_id: &str) -> impl Future<Output = DbResult<i64>> + Send;

    /// Mark a token inactive.
    fn revoke(&self, user_id: &str, id: &str) -> impl Future<Output = DbResult<()>> + Send;

    /// Record the time and origin of the latest use.
    fn touch(
        &self,
        id: &str,
        used_at: &str,
        ip: Option<&str>,
    ) -> impl Future<Output = DbResult<()>> + Send;
}

/// Repository for tasks. Every operation is scoped to the owning user.
pub trait TaskRepository {
    /// List a user's tasks matching the query.
    fn list(
        &self,
        user_id: &str,
        query: &TaskQuery,
    ) -> impl Future<Output = DbResult<Vec<Task>>> + Send;

    /// Get one of a user's tasks.
    fn get(&self, user_id: &str, id: &str) -> impl Future<Output = DbResult<Task>> + Send;

    /// Create a new task. Timestamps are set by the repository.
    fn create(&self, task: &Task) -> impl Future<Output = DbResult<Task>> + Send;

    /// Persist every mutable field of an existing task and bump `updated_at`.
    fn update(&self, task: &Task) -> impl Future<Output = DbResult<Task>> + Send;

    /// Delete one of a user's tasks.
    fn delete(&self, user_id: &str, id: &str) -> impl Future<Output = DbResult<()>> + Send;
}

/// Repository for categories. Every operation is scoped to the owning user.
pub trait CategoryRepository {
    /// List a user's categories ordered by name, with task counts.
    fn list(&self, user_id: &str) -> impl Future<Output = DbResult<Vec<Category>>> + Send;

    /// Get one of a user's categories.
    fn get(&self, user_id: &str, id: &str) -> impl Future<Output = DbResult<Category>> + Send;

    /// Find a category by name, ignoring case.
    fn find_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> impl Future<Output = DbResult<Option<Category>>> + Send;

    /// Create a new category.
    fn create(&self, category: &Category) -> impl Future<Output = DbResult<Category>> + Send;
}

/// Combined database interface.
///
/// Repositories are exposed through associated types so callers stay generic
/// over the backend without dynamic dispatch.
pub trait Database: Send + Sync {
    type Users<'a>: UserRepository + Send + Sync + 'a
    where
        Self: 'a;
    type Tokens<'a>: TokenRepository + Send + Sync + 'a
    where
        Self: 'a;
    type Tasks<'a>: TaskRepository + Send + Sync + 'a
    where
        Self: 'a;
    type Categories<'a>: CategoryRepository + Send + Sync + 'a
    where
        Self: 'a;

    /// Run pending migrations.
    fn migrate(&self) -> impl Future<Output = DbResult<()>> + Send;

    fn users(&self) -> Self::Users<'_>;

    fn tokens(&self) -> Self::Tokens<'_>;

    fn tasks(&self) -> Self::Tasks<'_>;

    fn categories(&self) -> Self::Categories<'_>;
}
