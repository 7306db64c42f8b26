//! Board and team identifiers plus the persisted board document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque team identifier, matching an external organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub String);

/// Opaque board identifier, unique within its team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(pub String);

impl TeamId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl BoardId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TeamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&str> for BoardId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Fully qualified board reference. Registry and throttle keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardKey {
    pub team: TeamId,
    pub board: BoardId,
}

impl BoardKey {
    pub fn new(team: impl Into<TeamId>, board: impl Into<BoardId>) -> Self {
        Self {
            team: team.into(),
            board: board.into(),
        }
    }

    /// Resource label used in log lines and rejection frames,
    /// e.g. `team@t1.board@b1`.
    pub fn resource(&self) -> String {
        format!("team@{}.board@{}", self.team, self.board)
    }
}

impl fmt::Display for BoardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.team, self.board)
    }
}

/// An uploaded asset stored inline in the board file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardAsset {
    pub id: String,
    #[serde(rename = "dataURL")]
    pub data_url: String,
}

/// The persisted form of a board: the engine-defined document plus its
/// inline assets. This is exactly the shape of `{boardId}.json` on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardDocument {
    pub content: Value,
    pub assets: Vec<BoardAsset>,
}

impl Default for BoardDocument {
    fn default() -> Self {
        Self {
            content: Value::Object(serde_json::Map::new()),
            assets: Vec::new(),
        }
    }
}

impl BoardDocument {
    pub fn new(content: Value) -> Self {
        Self {
            content,
            assets: Vec::new(),
        }
    }
}

/// Live-session view exposed by the introspection API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub team_id: TeamId,
    pub board_id: BoardId,
    pub connections: usize,
    pub created_at: DateTime<Utc>,
}
