//! Application state for the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::auth::{Authenticator, LoginKeys};
use crate::db::Database;
use crate::mcp::{SessionRegistry, ToolRegistry};

/// Default interval between SSE keep-alive comments.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Shared application state.
///
/// Generic over `D: Database`; every dependency is injected through the
/// constructor and shared behind `Arc`s, so clones are cheap.
pub struct AppState<D: Database> {
    db: Arc<D>,
    authenticator: Authenticator<D>,
    sessions: Arc<SessionRegistry<D>>,
    tools: Arc<ToolRegistry<D>>,
    keep_alive: Duration,
    shutdown: CancellationToken,
}

// Manual Clone impl - D itself need not be Clone.
impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            authenticator: self.authenticator.clone(),
            sessions: Arc::clone(&self.sessions),
            tools: Arc::clone(&self.tools),
            keep_alive: self.keep_alive,
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<D: Database + 'static> AppState<D> {
    /// Create a new AppState.
    ///
    /// - `db`: Database implementation
    /// - `login`: keys for primary login tokens, if enabled
    /// - `max_sessions`: cap on concurrently open MCP sessions
    pub fn new(db: D, login: Option<LoginKeys>, max_sessions: usize) -> Self {
        let db = Arc::new(db);
        Self {
            authenticator: Authenticator::new(Arc::clone(&db), login),
            sessions: Arc::new(SessionRegistry::new(max_sessions)),
            tools: Arc::new(ToolRegistry::new()),
            keep_alive: DEFAULT_KEEP_ALIVE,
            shutdown: CancellationToken::new(),
            db,
        }
    }

    /// Override the SSE keep-alive interval.
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Use an externally owned shutdown token.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &D {
        &self.db
    }

    /// Get a cloned Arc to the database.
    pub fn db_arc(&self) -> Arc<D> {
        Arc::clone(&self.db)
    }

    pub fn authenticator(&self) -> &Authenticator<D> {
        &self.authenticator
    }

    pub fn sessions(&self) -> &SessionRegistry<D> {
        &self.sessions
    }

    pub fn tools(&self) -> &Arc<ToolRegistry<D>> {
        &self.tools
    }

    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Cancelled when the server shuts down.
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }
}
