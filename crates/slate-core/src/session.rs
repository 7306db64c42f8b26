//! Collaboration sessions: the factory over the sync engine and the live,
//! registry-owned session object.

use crate::engine::{ChangeCallback, ClientSocket, SessionHandle, SyncEngine};
use chrono::{DateTime, Utc};
use slate_types::{BoardDocument, BoardKey, SessionSummary};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Builds live sessions from persisted board documents. Pure construction;
/// all I/O stays in the Board Store.
pub struct SessionFactory {
    engine: Arc<dyn SyncEngine>,
    client_timeout: Duration,
}

impl SessionFactory {
    pub fn new(engine: Arc<dyn SyncEngine>, client_timeout: Duration) -> Self {
        Self {
            engine,
            client_timeout,
        }
    }

    pub fn create(
        &self,
        key: BoardKey,
        initial: BoardDocument,
        on_change: ChangeCallback,
    ) -> Arc<LiveSession> {
        let handle = self
            .engine
            .create_session(initial, self.client_timeout, on_change);
        Arc::new(LiveSession {
            key,
            handle,
            created_at: Utc::now(),
            idle: AtomicBool::new(false),
        })
    }
}

/// The in-memory collaborative-editing instance for one board. At most one
/// of these exists per board key while registered.
pub struct LiveSession {
    key: BoardKey,
    handle: Arc<dyn SessionHandle>,
    created_at: DateTime<Utc>,
    /// Set when a sweep observes zero connections; eviction happens on the
    /// second consecutive observation.
    idle: AtomicBool,
}

impl LiveSession {
    pub fn key(&self) -> &BoardKey {
        &self.key
    }

    pub fn handle(&self) -> &Arc<dyn SessionHandle> {
        &self.handle
    }

    pub fn attach(&self, session_token: Option<String>, socket: ClientSocket) {
        self.handle.clone().attach(session_token, socket);
    }

    pub fn snapshot(&self) -> BoardDocument {
        self.handle.current_snapshot()
    }

    pub fn open_connections(&self) -> usize {
        self.handle.open_connections()
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            team_id: self.key.team.clone(),
            board_id: self.key.board.clone(),
            connections: self.open_connections(),
            created_at: self.created_at,
        }
    }

    pub(crate) fn mark_idle(&self) -> bool {
        self.idle.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn clear_idle(&self) {
        self.idle.store(false, Ordering::SeqCst);
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.idle.load(Ordering::SeqCst)
    }
}

// The engine handle is a trait object, so derive is unavailable.
impl fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSession")
            .field("key", &self.key)
            .field("connections", &self.open_connections())
            .finish()
    }
}
