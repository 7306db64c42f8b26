//! WebSocket message protocol between whiteboard clients and the server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames sent from a client replica to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Replace the authoritative document content with the client's copy.
    /// Merge ordering among replicas is the engine's concern.
    Update { content: Value },
    /// Keepalive.
    Ping { timestamp: u64 },
}

/// Frames sent from the server to a client replica.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Sent once after a connection is attached: the current authoritative
    /// document for the board.
    Init { content: Value },
    /// Another replica changed the document.
    Update { content: Value },
    /// Keepalive reply.
    Pong { timestamp: u64 },
    /// Terminal rejection; the socket is closed after this frame.
    Rejected(Rejection),
}

/// Structured rejection payload sent before closing a connection whose
/// target could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub status: u16,
    pub message: String,
    pub resource: String,
}

impl Rejection {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self {
            status: 404,
            message: "team or board does not exist".to_string(),
            resource: resource.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            status: 400,
            message: message.into(),
            resource: resource.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_frame_deserializes_tagged() {
        let frame: ClientFrame =
            serde_json::from_value(json!({"type": "update", "content": {"shapes": [1]}})).unwrap();
        match frame {
            ClientFrame::Update { content } => assert_eq!(content, json!({"shapes": [1]})),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn rejection_frame_shape() {
        let frame = ServerFrame::Rejected(Rejection::not_found("team@t1.board@b1"));
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "rejected");
        assert_eq!(value["status"], 404);
        assert_eq!(value["resource"], "team@t1.board@b1");
    }
}
