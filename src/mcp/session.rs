//! Session registry shared by both transports.
//!
//! A session binds one authenticated principal to one protocol handler and,
//! while a client is listening, one push channel. Sessions are owned by the
//! registry; transports hold an `Arc<Session>` only for the duration of a
//! request or an open stream.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::Principal;
use crate::db::Database;

use super::handler::McpHandler;
use super::protocol::JsonRpcResponse;

/// Which transport opened a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Sse,
    StreamableHttp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Sse => f.write_str("sse"),
            TransportKind::StreamableHttp => f.write_str("streamable-http"),
        }
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum SessionError {
    #[error("Session limit reached ({max} active sessions)")]
    #[diagnostic(
        code(taskhub::session::capacity),
        help("Close idle sessions or raise TASKHUB_MAX_SESSIONS")
    )]
    CapacityReached { max: usize },
}

/// Sender half of a session's event stream.
pub type PushSender = mpsc::UnboundedSender<JsonRpcResponse>;
pub type PushReceiver = mpsc::UnboundedReceiver<JsonRpcResponse>;

/// One live MCP session.
pub struct Session<D: Database> {
    id: String,
    kind: TransportKind,
    handler: McpHandler<D>,
    turn: Mutex<()>,
    push: StdMutex<Option<PushSender>>,
    cancel: CancellationToken,
    created_at: Instant,
    last_activity: StdMutex<Instant>,
}

impl<D: Database> fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<D: Database + 'static> Session<D> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn principal(&self) -> &Principal {
        self.handler.principal()
    }

    pub fn handler(&self) -> &McpHandler<D> {
        &self.handler
    }

    /// Cancelled when the session is removed.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Acquire the session's turn. Messages are handled one at a time.
    pub async fn turn(&self) -> MutexGuard<'_, ()> {
        self.turn.lock().await
    }

    pub fn touch(&self) {
        if let Ok(mut last) = self.last_activity.lock() {
            *last = Instant::now();
        }
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default()
    }

    /// Install a fresh push channel, replacing (and thereby closing) any
    /// previous one.
    pub fn open_stream(&self) -> PushReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut slot) = self.push.lock() {
            *slot = Some(tx);
        }
        rx
    }

    /// Queue a message on the open stream. Returns false when nobody listens.
    pub fn push(&self, message: JsonRpcResponse) -> bool {
        let Ok(slot) = self.push.lock() else {
            return false;
        };
        match slot.as_ref() {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    pub fn has_stream(&self) -> bool {
        self.push
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|tx| !tx.is_closed()))
            .unwrap_or(false)
    }

    fn close(&self) {
        self.cancel.cancel();
        if let Ok(mut slot) = self.push.lock() {
            slot.take();
        }
    }
}

/// Concurrent map of live sessions.
///
/// Injected through application state; separate registries share nothing.
pub struct SessionRegistry<D: Database> {
    sessions: DashMap<String, Arc<Session<D>>>,
    /// Reserved slots; counts sessions being created as well as live ones.
    active: AtomicUsize,
    max_sessions: usize,
}

impl<D: Database + 'static> SessionRegistry<D> {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            active: AtomicUsize::new(0),
            max_sessions,
        }
    }

    /// Register a new session under a fresh random id.
    pub fn create(
        &self,
        kind: TransportKind,
        handler: McpHandler<D>,
    ) -> Result<Arc<Session<D>>, SessionError> {
        let max = self.max_sessions;
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .map_err(|_| SessionError::CapacityReached { max })?;

        let session = loop {
            let id = uuid::Uuid::new_v4().to_string();
            if let Entry::Vacant(slot) = self.sessions.entry(id) {
                let now = Instant::now();
                let session = Arc::new(Session {
                    id: slot.key().clone(),
                    kind,
                    handler,
                    turn: Mutex::new(()),
                    push: StdMutex::new(None),
                    cancel: CancellationToken::new(),
                    created_at: now,
                    last_activity: StdMutex::new(now),
                });
                slot.insert(Arc::clone(&session));
                break session;
            }
        };

        info!(
            session = %session.id,
            transport = %kind,
            user = %session.principal().username,
            "Session opened"
        );
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session<D>>> {
        self.sessions.get(id).map(|s| Arc::clone(s.value()))
    }

    /// Remove a session and cancel its streams. Unknown ids are a no-op.
    pub fn remove(&self, id: &str) -> Option<Arc<Session<D>>> {
        let (_, session) = self.sessions.remove(id)?;
        self.active.fetch_sub(1, Ordering::AcqRel);
        session.close();
        info!(
            session = %id,
            transport = %session.kind,
            age_secs = session.created_at.elapsed().as_secs(),
            "Session closed"
        );
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.key().clone()).collect()
    }

    /// Remove sessions idle for longer than `max_idle`. Sessions whose turn is
    /// currently held, or with a client listening on their stream, are never
    /// reaped.
    pub fn reap_idle(&self, max_idle: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|s| {
                s.idle_for() > max_idle && !s.has_stream() && s.turn.try_lock().is_ok()
            })
            .map(|s| s.key().clone())
            .collect();

        for id in &stale {
            debug!(session = %id, "Reaping idle session");
            self.remove(id);
        }
        stale
    }

    /// Close every session. Used on shutdown.
    pub fn close_all(&self) -> usize {
        let ids = self.ids();
        for id in &ids {
            self.remove(id);
        }
        ids.len()
    }
}
