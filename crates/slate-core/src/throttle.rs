//! Persistence Throttle: coalesces change notifications into at most one
//! Board Store save per board per interval.
//!
//! The first `schedule` for a board arms a timer; further schedules inside
//! the window are absorbed, each replacing the pending snapshot producer.
//! When the timer fires, the most recent producer is invoked to obtain the
//! document as it is *now*, and exactly one save runs.
//! A change arriving while a save is in flight re-arms the timer, so the
//! latest state always reaches disk. Saves for one board never overlap.

use crate::store::BoardStore;
use dashmap::DashMap;
use slate_types::{BoardDocument, BoardKey};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

type SnapshotProducer = Box<dyn Fn() -> BoardDocument + Send + Sync>;

/// Armed or in-flight flush state for one board.
struct PendingFlush {
    dirty: AtomicBool,
    /// Swapped on every schedule. The flush task reads it at fire time, so a
    /// board whose session was replaced mid-window still persists the new
    /// session's state.
    producer: Mutex<SnapshotProducer>,
}

pub struct PersistenceThrottle {
    store: Arc<BoardStore>,
    interval: Duration,
    pending: DashMap<BoardKey, Arc<PendingFlush>>,
}

impl PersistenceThrottle {
    pub fn new(store: Arc<BoardStore>, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            store,
            interval,
            pending: DashMap::new(),
        })
    }

    /// Record that a board's in-memory state changed. `producer` is called
    /// at flush time, not now.
    pub fn schedule<F>(self: &Arc<Self>, key: BoardKey, producer: F)
    where
        F: Fn() -> BoardDocument + Send + Sync + 'static,
    {
        use dashmap::mapref::entry::Entry;

        match self.pending.entry(key.clone()) {
            Entry::Occupied(entry) => {
                // A flush is already armed or in flight; swap in the latest
                // producer and mark the slot dirty so a change during the
                // save is not lost.
                let pending = entry.get();
                *pending.producer.lock().unwrap() = Box::new(producer);
                pending.dirty.store(true, Ordering::SeqCst);
            }
            Entry::Vacant(entry) => {
                let pending = Arc::new(PendingFlush {
                    dirty: AtomicBool::new(true),
                    producer: Mutex::new(Box::new(producer) as SnapshotProducer),
                });
                entry.insert(pending.clone());

                let throttle = self.clone();
                tokio::spawn(async move {
                    loop {
                        tokio::time::sleep(throttle.interval).await;
                        pending.dirty.store(false, Ordering::SeqCst);

                        let snapshot = {
                            let producer = pending.producer.lock().unwrap();
                            producer()
                        };
                        match throttle
                            .store
                            .save(&key.team, &key.board, &snapshot)
                            .await
                        {
                            Ok(()) => {
                                debug!(target: "slate::flush", "Flushed board {}", key)
                            }
                            // Not retried here; the next change re-schedules.
                            Err(e) => {
                                warn!(target: "slate::flush", "Flush failed for {}: {}", key, e)
                            }
                        }

                        let done = throttle
                            .pending
                            .remove_if(&key, |_, p| !p.dirty.load(Ordering::SeqCst));
                        if done.is_some() {
                            break;
                        }
                    }
                });
            }
        }
    }

    /// Number of boards with an armed or in-flight flush.
    pub fn pending_flushes(&self) -> usize {
        self.pending.len()
    }
}
