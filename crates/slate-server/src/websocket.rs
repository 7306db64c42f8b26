//! WebSocket connection handling: resolve the target board through the
//! serialized resolver, then bridge the socket onto the session's engine
//! channels.

use crate::state::AppState;
use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use slate_core::ClientSocket;
use slate_types::{BoardId, BoardKey, ClientFrame, Rejection, ServerFrame, TeamId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Frames buffered per direction before backpressure kicks in.
const CHANNEL_BUFFER: usize = 32;

pub async fn handle_websocket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    team: TeamId,
    board: BoardId,
    session_token: Option<String>,
) -> Result<()> {
    let key = BoardKey::new(team.as_str(), board.as_str());

    let session = match state.resolver.resolve(team, board).await {
        Ok(session) => session,
        Err(e) => {
            // Terminal for this connection; the process carries on.
            info!(target: "slate::ws", "Rejecting connection to {}: {}", key, e);
            let rejection = if e.is_not_found() {
                Rejection::not_found(key.resource())
            } else {
                Rejection::bad_request(e.to_string(), key.resource())
            };
            let frame = serde_json::to_string(&ServerFrame::Rejected(rejection))?;
            let _ = socket.send(Message::Text(frame.into())).await;
            let _ = socket.send(Message::Close(None)).await;
            return Ok(());
        }
    };

    let (engine_socket, inbound_tx, mut outbound_rx) = ClientSocket::pair(CHANNEL_BUFFER);
    session.attach(session_token, engine_socket);
    info!(target: "slate::ws", "Connection attached to session {}", key);

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Engine -> client.
    let send_key = key.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    warn!(target: "slate::ws", "Failed to serialize frame for {}: {}", send_key, e);
                    continue;
                }
            };
            if let Err(e) = ws_tx.send(Message::Text(json.into())).await {
                debug!(target: "slate::ws", "Send failed for {} (client likely gone): {}", send_key, e);
                break;
            }
        }
    });

    // Client -> engine. Dropping `inbound_tx` on exit detaches the replica.
    let recv_key = key.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => {
                        if inbound_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(target: "slate::ws", "Ignoring malformed frame on {}: {}", recv_key, e);
                    }
                },
                Message::Close(_) => break,
                // Ping/pong are answered at the protocol layer.
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    debug!(target: "slate::ws", "Connection to {} closed", key);
    Ok(())
}
