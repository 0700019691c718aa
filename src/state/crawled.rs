// src/state/crawled.rs

//! Durable set of already-ingested repository IDs.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::Result;
use crate::state::{read_json, remove_if_exists, write_json_atomic};

/// Repository IDs that have already been persisted.
///
/// Grows monotonically within a run. An ID present here is never
/// re-fetched or re-persisted, under any topic or sort order.
pub struct CrawledIds {
    path: PathBuf,
    ids: HashSet<String>,
}

impl CrawledIds {
    /// Load the persisted set, or start empty if none exists.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ids: HashSet<String> = read_json::<Vec<String>>(&path)
            .await?
            .map(|list| list.into_iter().collect())
            .unwrap_or_default();
        Ok(Self { path, ids })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Record an ingested repository. Returns false if already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Atomically persist the set as a JSON array.
    pub async fn save(&self) -> Result<()> {
        let mut list: Vec<&String> = self.ids.iter().collect();
        list.sort();
        write_json_atomic(&self.path, &list).await
    }

    /// Clear the set and delete the persisted file.
    pub async fn reset(&mut self) -> Result<()> {
        self.ids.clear();
        remove_if_exists(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_loads_as_empty_set() {
        let tmp = TempDir::new().unwrap();
        let crawled = CrawledIds::load(tmp.path().join("crawled_repos.json"))
            .await
            .unwrap();
        assert!(crawled.is_empty());
    }

    #[tokio::test]
    async fn save_and_reload_preserve_membership() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("crawled_repos.json");

        let mut crawled = CrawledIds::load(&path).await.unwrap();
        assert!(crawled.insert("R_1"));
        assert!(crawled.insert("R_2"));
        crawled.save().await.unwrap();

        let reloaded = CrawledIds::load(&path).await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("R_1"));
        assert!(!reloaded.contains("R_3"));
    }

    #[tokio::test]
    async fn insert_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut crawled = CrawledIds::load(tmp.path().join("crawled_repos.json"))
            .await
            .unwrap();

        assert!(crawled.insert("R_1"));
        assert!(!crawled.insert("R_1"));
        assert_eq!(crawled.len(), 1);
    }

    #[tokio::test]
    async fn file_is_a_plain_json_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("crawled_repos.json");

        let mut crawled = CrawledIds::load(&path).await.unwrap();
        crawled.insert("R_2");
        crawled.insert("R_1");
        crawled.save().await.unwrap();

        let raw: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, vec!["R_1".to_string(), "R_2".to_string()]);
    }

    #[tokio::test]
    async fn reset_clears_memory_and_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("crawled_repos.json");

        let mut crawled = CrawledIds::load(&path).await.unwrap();
        crawled.insert("R_1");
        crawled.save().await.unwrap();

        crawled.reset().await.unwrap();
        assert!(crawled.is_empty());
        assert!(!path.exists());
    }
}
