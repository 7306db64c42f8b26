//! The synchronization-engine seam.
//!
//! The conflict-resolution engine is an external capability with a narrow
//! contract: build a session from a persisted document, attach client
//! replicas to it, report the current snapshot, and notify on change. The
//! bundled [`RelayEngine`] implements that contract with last-writer-wins
//! document replacement so the router is runnable and testable; it is not a
//! merge algorithm.

use slate_types::{BoardDocument, ClientFrame, ServerFrame};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Invoked by the engine whenever the authoritative in-memory document
/// changes due to any attached replica's edits.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Transport-agnostic socket handed to the engine when a connection
/// attaches. The server bridges a WebSocket onto these channels; tests use
/// bare channels.
pub struct ClientSocket {
    pub outbound: mpsc::Sender<ServerFrame>,
    pub inbound: mpsc::Receiver<ClientFrame>,
}

impl ClientSocket {
    /// A socket plus the server-side handles to drive it.
    pub fn pair(buffer: usize) -> (Self, mpsc::Sender<ClientFrame>, mpsc::Receiver<ServerFrame>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer);
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer);
        (
            Self {
                outbound: outbound_tx,
                inbound: inbound_rx,
            },
            inbound_tx,
            outbound_rx,
        )
    }
}

pub trait SyncEngine: Send + Sync {
    /// Pure construction; never fails given a loadable document.
    fn create_session(
        &self,
        initial: BoardDocument,
        client_timeout: Duration,
        on_change: ChangeCallback,
    ) -> Arc<dyn SessionHandle>;
}

pub trait SessionHandle: Send + Sync {
    /// Attach a client replica. A missing token means the engine assigns a
    /// distinct replica identity of its own.
    fn attach(self: Arc<Self>, session_token: Option<String>, socket: ClientSocket);

    /// The current authoritative document, suitable for persistence.
    fn current_snapshot(&self) -> BoardDocument;

    /// True once the session has no further use and may be reclaimed.
    fn is_closed(&self) -> bool;

    /// Number of currently attached replicas.
    fn open_connections(&self) -> usize;
}

/// Minimal engine: relays each replica's full-document updates to the other
/// replicas and keeps the latest update as the authoritative content.
#[derive(Default)]
pub struct RelayEngine;

impl SyncEngine for RelayEngine {
    fn create_session(
        &self,
        initial: BoardDocument,
        _client_timeout: Duration,
        on_change: ChangeCallback,
    ) -> Arc<dyn SessionHandle> {
        Arc::new(RelaySession {
            inner: Mutex::new(RelayState {
                document: initial,
                peers: HashMap::new(),
                ever_attached: false,
            }),
            on_change,
        })
    }
}

struct RelayState {
    document: BoardDocument,
    peers: HashMap<String, mpsc::Sender<ServerFrame>>,
    ever_attached: bool,
}

struct RelaySession {
    inner: Mutex<RelayState>,
    on_change: ChangeCallback,
}

impl RelaySession {
    fn apply_update(&self, from: &str, content: serde_json::Value) {
        let others: Vec<(String, mpsc::Sender<ServerFrame>)> = {
            let mut inner = self.inner.lock().unwrap();
            inner.document.content = content.clone();
            inner
                .peers
                .iter()
                .filter(|(id, _)| id.as_str() != from)
                .map(|(id, tx)| (id.clone(), tx.clone()))
                .collect()
        };

        (self.on_change)();

        for (id, tx) in others {
            let frame = ServerFrame::Update {
                content: content.clone(),
            };
            if tx.try_send(frame).is_err() {
                // Delivery is best effort; a slow replica resyncs on reconnect.
                warn!(target: "slate::session", "Dropped update for slow replica {}", id);
            }
        }
    }

    fn detach(&self, replica: &str, socket: &mpsc::Sender<ServerFrame>) {
        let mut inner = self.inner.lock().unwrap();
        // Only drop the peer entry if it still belongs to this socket; a
        // reconnect with the same token may have replaced it already.
        if inner
            .peers
            .get(replica)
            .is_some_and(|tx| tx.same_channel(socket))
        {
            inner.peers.remove(replica);
            debug!(target: "slate::session", "Replica {} detached ({} left)", replica, inner.peers.len());
        }
    }
}

impl SessionHandle for RelaySession {
    fn attach(self: Arc<Self>, session_token: Option<String>, socket: ClientSocket) {
        let replica = session_token.unwrap_or_else(|| Uuid::new_v4().to_string());
        let ClientSocket {
            outbound,
            mut inbound,
        } = socket;

        let init = {
            let mut inner = self.inner.lock().unwrap();
            inner.ever_attached = true;
            inner.peers.insert(replica.clone(), outbound.clone());
            debug!(target: "slate::session", "Replica {} attached ({} total)", replica, inner.peers.len());
            ServerFrame::Init {
                content: inner.document.content.clone(),
            }
        };
        let _ = outbound.try_send(init);

        let session = self.clone();
        tokio::spawn(async move {
            while let Some(frame) = inbound.recv().await {
                match frame {
                    ClientFrame::Update { content } => session.apply_update(&replica, content),
                    ClientFrame::Ping { timestamp } => {
                        let _ = outbound.try_send(ServerFrame::Pong { timestamp });
                    }
                }
            }
            session.detach(&replica, &outbound);
        });
    }

    fn current_snapshot(&self) -> BoardDocument {
        self.inner.lock().unwrap().document.clone()
    }

    fn is_closed(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.ever_attached && inner.peers.is_empty()
    }

    fn open_connections(&self) -> usize {
        self.inner.lock().unwrap().peers.len()
    }
}
