//! Session Registry: process-wide map from board key to at most one live
//! session, with creation-on-demand and idle eviction.

use crate::session::{LiveSession, SessionFactory};
use crate::store::BoardStore;
use crate::throttle::PersistenceThrottle;
use crate::Result;
use dashmap::DashMap;
use slate_types::{BoardId, BoardKey, SessionSummary, TeamId};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct SessionRegistry {
    store: Arc<BoardStore>,
    factory: SessionFactory,
    throttle: Arc<PersistenceThrottle>,
    sessions: DashMap<BoardKey, Arc<LiveSession>>,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<BoardStore>,
        factory: SessionFactory,
        throttle: Arc<PersistenceThrottle>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            factory,
            throttle,
            sessions: DashMap::new(),
        })
    }

    /// Return the live session for `board`, creating it from persisted
    /// content if absent. A board with no persisted file is never given a
    /// session; the not-found error is terminal for the caller's connection.
    ///
    /// Callers must funnel this through [`crate::Resolver`]: the check-then-
    /// register step below is only race-free because resolution is
    /// serialized process-wide.
    pub async fn resolve(&self, team: &TeamId, board: &BoardId) -> Result<Arc<LiveSession>> {
        let key = BoardKey::new(team.as_str(), board.as_str());

        if let Some(existing) = self.sessions.get(&key) {
            // Clear the idle mark while still holding the map guard, so a
            // concurrent sweep cannot remove the session between this lookup
            // and the caller attaching to it.
            existing.clear_idle();
            let session = existing.clone();
            drop(existing);
            debug!(target: "slate::session", "Reusing live session for {}", key);
            return Ok(session);
        }

        let initial = self.store.load(team, board).await?;

        // The change callback needs the session handle, which does not exist
        // until the factory runs; the slot closes that loop.
        let slot: Arc<OnceLock<Arc<LiveSession>>> = Arc::new(OnceLock::new());
        let on_change = {
            let slot = slot.clone();
            let throttle = self.throttle.clone();
            let key = key.clone();
            Arc::new(move || {
                if let Some(session) = slot.get() {
                    let handle = session.handle().clone();
                    throttle.schedule(key.clone(), move || handle.current_snapshot());
                }
            })
        };

        let session = self.factory.create(key.clone(), initial, on_change);
        let _ = slot.set(session.clone());
        self.sessions.insert(key.clone(), session.clone());
        info!(target: "slate::session", "Created session for {}", key);
        Ok(session)
    }

    /// One eviction pass: a session observed with zero open connections (or
    /// reporting closed) on two consecutive passes is removed. The
    /// one-interval grace window lets rapid reconnects reuse the session.
    pub fn sweep_once(&self) {
        let mut evict = Vec::new();
        for entry in self.sessions.iter() {
            let session = entry.value();
            if session.open_connections() == 0 || session.is_closed() {
                if session.mark_idle() {
                    evict.push(entry.key().clone());
                }
            } else {
                session.clear_idle();
            }
        }

        for key in evict {
            if self.try_evict(&key) {
                info!(target: "slate::session", "Evicted idle session for {}", key);
            }
        }
    }

    /// Removal re-checks both conditions under the map lock: a session that
    /// gained a connection, or whose idle mark a concurrent resolve cleared,
    /// stays registered.
    fn try_evict(&self, key: &BoardKey) -> bool {
        self.sessions
            .remove_if(key, |_, s| s.open_connections() == 0 && s.is_idle())
            .is_some()
    }

    pub fn contains(&self, key: &BoardKey) -> bool {
        self.sessions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.sessions.iter().map(|e| e.value().summary()).collect()
    }
}

/// Periodic idle-session sweep. Liveness, not instantaneous reclamation.
pub fn spawn_sweeper(registry: Arc<SessionRegistry>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so a fresh registry gets
        // a full interval before its first pass.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            registry.sweep_once();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ClientSocket, RelayEngine};
    use crate::SlateError;
    use serde_json::json;
    use slate_types::BoardDocument;
    use tempfile::tempdir;

    const FLUSH: Duration = Duration::from_millis(50);

    async fn registry_fixture() -> (
        tempfile::TempDir,
        Arc<BoardStore>,
        Arc<SessionRegistry>,
    ) {
        let dir = tempdir().unwrap();
        let store = Arc::new(BoardStore::open(dir.path().join("teams")).await.unwrap());
        let team = TeamId::from("t1");
        store.create_team(&team).await.unwrap();
        store
            .create_board(
                &team,
                &BoardId::from("b1"),
                &BoardDocument::new(json!({"shapes": []})),
            )
            .await
            .unwrap();

        let factory = SessionFactory::new(Arc::new(RelayEngine), Duration::from_secs(30));
        let throttle = PersistenceThrottle::new(store.clone(), FLUSH);
        let registry = SessionRegistry::new(store.clone(), factory, throttle);
        (dir, store, registry)
    }

    #[tokio::test]
    async fn resolve_returns_the_same_session_for_the_same_board() {
        let (_dir, _store, registry) = registry_fixture().await;
        let team = TeamId::from("t1");
        let board = BoardId::from("b1");

        let first = registry.resolve(&team, &board).await.unwrap();
        let second = registry.resolve(&team, &board).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn resolve_unknown_board_is_rejected_and_leaves_no_session() {
        let (_dir, _store, registry) = registry_fixture().await;

        let err = registry
            .resolve(&TeamId::from("t1"), &BoardId::from("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, SlateError::BoardNotFound(_)));
        assert!(registry.is_empty());

        let err = registry
            .resolve(&TeamId::from("ghost"), &BoardId::from("b1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SlateError::TeamNotFound(_)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn idle_session_survives_one_sweep_and_is_evicted_on_the_second() {
        let (_dir, _store, registry) = registry_fixture().await;
        let team = TeamId::from("t1");
        let board = BoardId::from("b1");

        registry.resolve(&team, &board).await.unwrap();

        registry.sweep_once();
        assert_eq!(registry.len(), 1, "grace window");

        registry.sweep_once();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn session_with_a_connection_is_not_evicted() {
        let (_dir, _store, registry) = registry_fixture().await;
        let team = TeamId::from("t1");
        let board = BoardId::from("b1");

        let session = registry.resolve(&team, &board).await.unwrap();
        let (socket, _tx, _rx) = ClientSocket::pair(8);
        session.attach(Some("c1".into()), socket);

        registry.sweep_once();
        registry.sweep_once();
        registry.sweep_once();
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn resolve_racing_the_removal_step_blocks_eviction() {
        let (_dir, _store, registry) = registry_fixture().await;
        let team = TeamId::from("t1");
        let board = BoardId::from("b1");
        let key = BoardKey::new("t1", "b1");

        let session = registry.resolve(&team, &board).await.unwrap();

        // Two consecutive sweeps observe the session idle and queue the key
        // for removal.
        assert!(!session.mark_idle());
        assert!(session.mark_idle());

        // A resolve lands between marking and removal and clears the flag;
        // the removal predicate must honor that and keep the session.
        session.clear_idle();
        assert!(!registry.try_evict(&key));
        assert_eq!(registry.len(), 1);

        // With the mark restored and still no connections, removal proceeds.
        session.mark_idle();
        assert!(registry.try_evict(&key));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn eviction_then_reconnect_reloads_from_disk() {
        let (_dir, store, registry) = registry_fixture().await;
        let team = TeamId::from("t1");
        let board = BoardId::from("b1");

        let first = registry.resolve(&team, &board).await.unwrap();
        registry.sweep_once();
        registry.sweep_once();
        assert!(registry.is_empty());

        // Mutate the persisted file while no session is live.
        store
            .save(&team, &board, &BoardDocument::new(json!({"rev": 2})))
            .await
            .unwrap();

        let fresh = registry.resolve(&team, &board).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert_eq!(fresh.snapshot().content, json!({"rev": 2}));
    }

    #[tokio::test]
    async fn engine_change_is_flushed_to_the_store_after_one_window() {
        let (_dir, store, registry) = registry_fixture().await;
        let team = TeamId::from("t1");
        let board = BoardId::from("b1");

        let session = registry.resolve(&team, &board).await.unwrap();
        let (socket, tx, mut rx) = ClientSocket::pair(8);
        session.attach(Some("c1".into()), socket);
        rx.recv().await.unwrap(); // init frame

        tx.send(slate_types::ClientFrame::Update {
            content: json!({"shapes": [{"id": "s1"}]}),
        })
        .await
        .unwrap();

        tokio::time::sleep(FLUSH * 3).await;

        let saved = store.load(&team, &board).await.unwrap();
        assert_eq!(saved.content, json!({"shapes": [{"id": "s1"}]}));
    }
}
