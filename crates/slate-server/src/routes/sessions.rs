//! Live-session introspection.

use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use slate_types::SessionSummary;
use std::sync::Arc;

#[derive(Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
    pub open_connections: usize,
}

pub async fn list(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    let sessions = state.registry.summaries();
    let open_connections = sessions.iter().map(|s| s.connections).sum();
    Json(SessionListResponse {
        sessions,
        open_connections,
    })
}
