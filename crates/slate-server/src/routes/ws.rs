//! WebSocket route handler for `/{teamId}/{boardId}?sessionId=...`.

use crate::state::AppState;
use crate::websocket::handle_websocket;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use slate_core::SlateError;
use slate_types::{BoardId, TeamId};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    /// Client replica token. Optional; the engine assigns its own identity
    /// when absent.
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

pub async fn upgrade(
    State(state): State<Arc<AppState>>,
    Path((team_id, board_id)): Path<(String, String)>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    // Malformed targets are rejected before the registry is ever queried.
    let (team, board) = match parse_target(team_id, board_id) {
        Ok(target) => target,
        Err(e) => {
            tracing::info!(target: "slate::ws", "Rejected connection: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_connection(socket, state, team, board, params.session_id))
}

fn parse_target(team_id: String, board_id: String) -> Result<(TeamId, BoardId), SlateError> {
    if team_id.trim().is_empty() || board_id.trim().is_empty() {
        return Err(SlateError::Protocol(format!("{}/{}", team_id, board_id)));
    }
    Ok((TeamId(team_id), BoardId(board_id)))
}

async fn handle_connection(
    socket: WebSocket,
    state: Arc<AppState>,
    team: TeamId,
    board: BoardId,
    session_token: Option<String>,
) {
    let target = format!("{}/{}", team, board);
    if let Err(e) = handle_websocket(socket, state, team, board, session_token).await {
        tracing::error!(target: "slate::ws", "WebSocket error for {}: {}", target, e);
    }
}
