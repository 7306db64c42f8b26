//! Error types for Slate.

use slate_types::{BoardKey, TeamId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlateError {
    #[error("team not found: {0}")]
    TeamNotFound(TeamId),

    #[error("board not found: {0}")]
    BoardNotFound(BoardKey),

    #[error("malformed connection target: {0}")]
    Protocol(String),

    #[error("persistence failure for {key}: {source}")]
    Persistence {
        key: BoardKey,
        #[source]
        source: std::io::Error,
    },

    #[error("resolution queue is closed")]
    ResolverClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SlateError {
    /// Whether this error means the connection target does not exist and the
    /// connection must be rejected rather than retried.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SlateError::TeamNotFound(_) | SlateError::BoardNotFound(_)
        )
    }
}
