//! HTTP server hosting both MCP transports.

mod handlers;
mod routes;
mod state;

#[cfg(test)]
pub(crate) mod test_app;

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::LoginKeys;
use crate::db::Database;
use crate::paths::get_db_path;

pub use handlers::{HealthResponse, McpInfoResponse, TransportInfo};
pub use routes::{ApiDoc, create_router};
pub use state::{AppState, DEFAULT_KEEP_ALIVE};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 1000;
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Error, Diagnostic, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    #[diagnostic(
        code(taskhub::server::bind),
        help("Is another process listening on this port?")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    #[diagnostic(code(taskhub::server::serve))]
    Serve(#[source] std::io::Error),
}

/// Server configuration.
///
/// Precedence: builder (CLI flag) > environment variable > default.
#[derive(Clone)]
pub struct Config {
    /// Host address to bind to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// SQLite database file
    pub db_path: PathBuf,
    /// HS256 secret for login tokens. Login tokens are rejected when unset.
    pub login_secret: Option<String>,
    /// Sessions without traffic for this long are closed
    pub session_idle_timeout: Duration,
    /// Maximum number of concurrently open sessions
    pub max_sessions: usize,
    /// How often idle sessions are looked for
    pub reap_interval: Duration,
}

// Keeps the secret out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db_path", &self.db_path)
            .field("login_secret", &self.login_secret.as_ref().map(|_| "***"))
            .field("session_idle_timeout", &self.session_idle_timeout)
            .field("max_sessions", &self.max_sessions)
            .field("reap_interval", &self.reap_interval)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            db_path: get_db_path(),
            login_secret: None,
            session_idle_timeout: DEFAULT_SESSION_IDLE,
            max_sessions: DEFAULT_MAX_SESSIONS,
            reap_interval: DEFAULT_REAP_INTERVAL,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Defaults overridden by `TASKHUB_*` environment variables.
    ///
    /// Unparsable values are ignored.
    pub fn new() -> Self {
        let defaults = Self::default();
        Self {
            host: env_parse("TASKHUB_HOST").unwrap_or(defaults.host),
            port: env_parse("TASKHUB_PORT").unwrap_or(defaults.port),
            db_path: env::var_os("TASKHUB_DB")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            login_secret: env::var("TASKHUB_JWT_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            session_idle_timeout: env_parse("TASKHUB_SESSION_IDLE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_idle_timeout),
            max_sessions: env_parse("TASKHUB_MAX_SESSIONS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_sessions),
            reap_interval: defaults.reap_interval,
        }
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_db_path(mut self, db_path: PathBuf) -> Self {
        self.db_path = db_path;
        self
    }

    pub fn with_login_secret(mut self, secret: String) -> Self {
        self.login_secret = Some(secret);
        self
    }

    pub fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = timeout;
        self
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    pub fn login_keys(&self) -> Option<LoginKeys> {
        self.login_secret.as_deref().map(LoginKeys::from_secret)
    }
}

/// Initialize tracing subscriber with env filter
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskhub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Periodically close sessions idle for longer than `max_idle`.
///
/// Stops when the state's shutdown token is cancelled.
pub fn spawn_reaper<D: Database + 'static>(
    state: AppState<D>,
    max_idle: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = state.shutdown().cancelled() => break,
                _ = ticker.tick() => {
                    let reaped = state.sessions().reap_idle(max_idle);
                    if !reaped.is_empty() {
                        info!(count = reaped.len(), "Reaped idle sessions");
                    }
                }
            }
        }
        debug!("Session reaper stopped");
    })
}

/// Run the MCP server with the given configuration.
///
/// The database is injected so the server stays agnostic of the storage
/// backend. Returns after Ctrl-C once every session has been closed.
pub async fn run<D: Database + 'static>(config: Config, db: D) -> Result<(), ServerError> {
    init_tracing();
    if config.login_secret.is_none() {
        info!("TASKHUB_JWT_SECRET not set, only API tokens are accepted");
    }

    let shutdown = CancellationToken::new();
    let state = AppState::new(db, config.login_keys(), config.max_sessions)
        .with_shutdown(shutdown.clone());
    let reaper = spawn_reaper(
        state.clone(),
        config.session_idle_timeout,
        config.reap_interval,
    );

    let app = create_router(state.clone()).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!("MCP server listening on http://{}", addr);
    info!("  Streamable HTTP: http://{}/mcp", addr);
    info!("  Legacy SSE:      http://{}/mcp/sse", addr);

    let signal_state = state.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
            _ = signal_state.shutdown().cancelled() => {}
        }
        // Ends every open event stream so connections can drain.
        signal_state.shutdown().cancel();
        let closed = signal_state.sessions().close_all();
        info!(closed, "Closed all sessions");
    })
    .await
    .map_err(ServerError::Serve)?;

    shutdown.cancel();
    let _ = reaper.await;
    info!("Server stopped");
    Ok(())
}
