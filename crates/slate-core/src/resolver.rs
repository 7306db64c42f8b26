//! Serialized board resolution.
//!
//! Registry resolution for a not-yet-live board does filesystem I/O followed
//! by a non-atomic check-then-register step. To keep the one-session-per-
//! board invariant without per-board locks, every resolution in the process
//! goes through a single-worker queue: request N completes before request
//! N+1 starts. Only resolution is serialized; attachment and ongoing traffic
//! are not.

use crate::registry::SessionRegistry;
use crate::session::LiveSession;
use crate::{Result, SlateError};
use slate_types::{BoardId, TeamId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

struct ResolveRequest {
    team: TeamId,
    board: BoardId,
    reply: oneshot::Sender<Result<Arc<LiveSession>>>,
}

#[derive(Clone)]
pub struct Resolver {
    tx: mpsc::Sender<ResolveRequest>,
}

impl Resolver {
    /// Spawn the resolution worker for `registry`.
    pub fn spawn(registry: Arc<SessionRegistry>) -> Self {
        let (tx, mut rx) = mpsc::channel::<ResolveRequest>(64);

        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                debug!(
                    target: "slate::session",
                    "Resolving {}/{}", request.team, request.board
                );
                let result = registry.resolve(&request.team, &request.board).await;
                // The caller may have hung up; nothing to do then.
                let _ = request.reply.send(result);
            }
        });

        Self { tx }
    }

    pub async fn resolve(&self, team: TeamId, board: BoardId) -> Result<Arc<LiveSession>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ResolveRequest { team, board, reply })
            .await
            .map_err(|_| SlateError::ResolverClosed)?;
        rx.await.map_err(|_| SlateError::ResolverClosed)?
    }
}
