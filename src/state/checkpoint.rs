// src/state/checkpoint.rs

//! Durable crawl-position checkpoint.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::{read_json, remove_if_exists, write_json_atomic};

/// Resumable crawl position.
///
/// The cursor is meaningful only within the stored (topic, sort) pair and
/// must be reset to null whenever either index advances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub current_topic_index: usize,
    pub current_sort_index: usize,
    pub current_page: Option<String>,
    pub repos_crawled_for_topic: usize,
    pub batch_size: u32,
}

impl Checkpoint {
    /// Fresh checkpoint starting at the first topic and sort mode.
    pub fn new(batch_size: u32) -> Self {
        Self {
            current_topic_index: 0,
            current_sort_index: 0,
            current_page: None,
            repos_crawled_for_topic: 0,
            batch_size,
        }
    }
}

/// Loads and atomically saves the checkpoint file.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted checkpoint, or a fresh one if none exists.
    pub async fn load(&self, default_batch_size: u32) -> Result<Checkpoint> {
        Ok(read_json(&self.path)
            .await?
            .unwrap_or_else(|| Checkpoint::new(default_batch_size)))
    }

    /// Atomically persist the checkpoint.
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        write_json_atomic(&self.path, checkpoint).await
    }

    /// Delete the persisted checkpoint entirely.
    pub async fn reset(&self) -> Result<()> {
        remove_if_exists(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_returns_defaults_when_file_is_absent() {
        let tmp = TempDir::new().unwrap();
        let store = CheckpointStore::new(tmp.path().join("checkpoint.json"));

        let checkpoint = store.load(20).await.unwrap();
        assert_eq!(checkpoint, Checkpoint::new(20));
        assert_eq!(checkpoint.current_page, None);
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = CheckpointStore::new(tmp.path().join("checkpoint.json"));

        let checkpoint = Checkpoint {
            current_topic_index: 2,
            current_sort_index: 1,
            current_page: Some("abc".to_string()),
            repos_crawled_for_topic: 37,
            batch_size: 10,
        };
        store.save(&checkpoint).await.unwrap();

        let loaded = store.load(20).await.unwrap();
        assert_eq!(loaded, checkpoint);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file_behind() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("checkpoint.json");
        let store = CheckpointStore::new(&path);

        store.save(&Checkpoint::new(20)).await.unwrap();
        assert!(path.exists());
        assert!(!tmp.path().join("checkpoint.tmp").exists());
    }

    #[tokio::test]
    async fn persisted_keys_match_the_contract() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("checkpoint.json");
        let store = CheckpointStore::new(&path);
        store.save(&Checkpoint::new(20)).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        for key in [
            "current_topic_index",
            "current_sort_index",
            "current_page",
            "repos_crawled_for_topic",
            "batch_size",
        ] {
            assert!(raw.get(key).is_some(), "missing key {key}");
        }
        assert!(raw["current_page"].is_null());
    }

    #[tokio::test]
    async fn reset_removes_the_file_and_tolerates_absence() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("checkpoint.json");
        let store = CheckpointStore::new(&path);

        store.save(&Checkpoint::new(20)).await.unwrap();
        store.reset().await.unwrap();
        assert!(!path.exists());

        // Resetting again is not an error.
        store.reset().await.unwrap();
    }
}
