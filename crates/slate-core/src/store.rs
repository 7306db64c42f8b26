//! Board Store: persisted board documents on the local filesystem.
//!
//! Layout is one directory per team under a base `teams` directory, with one
//! `{boardId}.json` file per board. `save` replaces the whole file
//! (last-writer-wins); it never merges.

use crate::{Result, SlateError};
use slate_types::{BoardDocument, BoardId, BoardKey, TeamId};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub struct BoardStore {
    base_dir: PathBuf,
}

impl BoardStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn team_path(&self, team: &TeamId) -> PathBuf {
        self.base_dir.join(team.as_str())
    }

    fn board_path(&self, team: &TeamId, board: &BoardId) -> PathBuf {
        self.team_path(team).join(format!("{}.json", board))
    }

    /// Provision a team directory. Idempotent; the external CRUD layer calls
    /// this when an organization is created.
    pub async fn create_team(&self, team: &TeamId) -> Result<()> {
        fs::create_dir_all(self.team_path(team)).await?;
        Ok(())
    }

    /// Create a board file inside an existing team directory.
    pub async fn create_board(
        &self,
        team: &TeamId,
        board: &BoardId,
        document: &BoardDocument,
    ) -> Result<()> {
        let team_path = self.team_path(team);
        if !fs::try_exists(&team_path).await? {
            return Err(SlateError::TeamNotFound(team.clone()));
        }
        let text = serde_json::to_vec_pretty(document)?;
        fs::write(self.board_path(team, board), text).await?;
        Ok(())
    }

    /// Load a board document. Fails with a not-found error when the team
    /// directory or the board file is absent; malformed JSON surfaces as a
    /// load-time parse error.
    pub async fn load(&self, team: &TeamId, board: &BoardId) -> Result<BoardDocument> {
        let team_path = self.team_path(team);
        if !fs::try_exists(&team_path).await? {
            return Err(SlateError::TeamNotFound(team.clone()));
        }

        let board_path = self.board_path(team, board);
        let bytes = match fs::read(&board_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SlateError::BoardNotFound(BoardKey::new(
                    team.as_str(),
                    board.as_str(),
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let document = serde_json::from_slice(&bytes)?;
        debug!(target: "slate::store", "Loaded board {}/{} ({} bytes)", team, board, bytes.len());
        Ok(document)
    }

    /// Overwrite a board document. The write goes to a temp file in the team
    /// directory and is renamed over the board file, so a concurrent `load`
    /// never observes a truncated document.
    pub async fn save(
        &self,
        team: &TeamId,
        board: &BoardId,
        document: &BoardDocument,
    ) -> Result<()> {
        let key = BoardKey::new(team.as_str(), board.as_str());

        let board_path = self.board_path(team, board);
        if !fs::try_exists(&board_path).await? {
            if !fs::try_exists(self.team_path(team)).await? {
                return Err(SlateError::TeamNotFound(team.clone()));
            }
            return Err(SlateError::BoardNotFound(key));
        }

        let bytes = serde_json::to_vec(document)?;
        let tmp_path = self.team_path(team).join(format!("{}.json.tmp", board));

        let write = async {
            fs::write(&tmp_path, &bytes).await?;
            fs::rename(&tmp_path, &board_path).await
        };
        write.await.map_err(|source| SlateError::Persistence {
            key: key.clone(),
            source,
        })?;

        debug!(target: "slate::store", "Saved board {} ({} bytes)", key, bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slate_types::BoardAsset;
    use tempfile::tempdir;

    async fn store_with_board(content: serde_json::Value) -> (tempfile::TempDir, BoardStore) {
        let dir = tempdir().unwrap();
        let store = BoardStore::open(dir.path().join("teams")).await.unwrap();
        let team = TeamId::from("t1");
        store.create_team(&team).await.unwrap();
        store
            .create_board(&team, &BoardId::from("b1"), &BoardDocument::new(content))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (_dir, store) = store_with_board(json!({})).await;
        let team = TeamId::from("t1");
        let board = BoardId::from("b1");

        let doc = BoardDocument {
            content: json!({"shapes": [{"id": "s1", "kind": "oval"}]}),
            assets: vec![BoardAsset {
                id: "a1".into(),
                data_url: "data:image/png;base64,AAAA".into(),
            }],
        };
        store.save(&team, &board, &doc).await.unwrap();

        let loaded = store.load(&team, &board).await.unwrap();
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn load_missing_team_is_team_not_found() {
        let dir = tempdir().unwrap();
        let store = BoardStore::open(dir.path().join("teams")).await.unwrap();

        let err = store
            .load(&TeamId::from("ghost"), &BoardId::from("b1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SlateError::TeamNotFound(_)));
    }

    #[tokio::test]
    async fn load_missing_board_is_board_not_found() {
        let (_dir, store) = store_with_board(json!({})).await;

        let err = store
            .load(&TeamId::from("t1"), &BoardId::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, SlateError::BoardNotFound(_)));
    }

    #[tokio::test]
    async fn save_missing_board_is_rejected() {
        let (_dir, store) = store_with_board(json!({})).await;

        let err = store
            .save(
                &TeamId::from("t1"),
                &BoardId::from("nope"),
                &BoardDocument::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SlateError::BoardNotFound(_)));

        let err = store
            .save(
                &TeamId::from("ghost"),
                &BoardId::from("b1"),
                &BoardDocument::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SlateError::TeamNotFound(_)));
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file_behind() {
        let (_dir, store) = store_with_board(json!({})).await;
        let team = TeamId::from("t1");
        let board = BoardId::from("b1");

        store
            .save(&team, &board, &BoardDocument::new(json!({"v": 2})))
            .await
            .unwrap();

        let tmp = store.base_dir().join("t1").join("b1.json.tmp");
        assert!(!tmp.exists());
    }

    #[tokio::test]
    async fn malformed_board_file_is_a_load_error() {
        let (_dir, store) = store_with_board(json!({})).await;
        let path = store.base_dir().join("t1").join("b1.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = store
            .load(&TeamId::from("t1"), &BoardId::from("b1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SlateError::Json(_)));
    }
}
