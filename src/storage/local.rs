// src/storage/local.rs

//! Local filesystem sink implementation.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{ReadmeArtifact, RepoRecord};
use crate::storage::RepoSink;

/// Header row for the repository CSV, written once when the file is created.
const CSV_HEADER: [&str; 11] = [
    "repo_id",
    "name",
    "full_name",
    "description",
    "topics",
    "language",
    "stars_count",
    "forks_count",
    "created_at",
    "updated_at",
    "url",
];

/// Filesystem-backed sink pair.
#[derive(Clone)]
pub struct LocalSink {
    repos_csv: PathBuf,
    readme_jsonl: PathBuf,
}

impl LocalSink {
    pub fn new(repos_csv: impl Into<PathBuf>, readme_jsonl: impl Into<PathBuf>) -> Self {
        Self {
            repos_csv: repos_csv.into(),
            readme_jsonl: readme_jsonl.into(),
        }
    }

    /// Append raw bytes to a file, creating it first if needed.
    async fn append_bytes(path: &PathBuf, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl RepoSink for LocalSink {
    async fn append_repo(&self, record: &RepoRecord) -> Result<()> {
        let write_header = !self.repos_csv.exists();

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if write_header {
            writer.write_record(CSV_HEADER)?;
        }
        writer.write_record([
            record.repo_id.as_str(),
            record.name.as_str(),
            record.full_name.as_str(),
            record.description.as_str(),
            &record.topics_joined(),
            record.language.as_str(),
            &record.stars_count.to_string(),
            &record.forks_count.to_string(),
            record.created_at.as_str(),
            record.updated_at.as_str(),
            record.url.as_str(),
        ])?;

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Csv(e.into_error().into()))?;
        Self::append_bytes(&self.repos_csv, &bytes).await
    }

    async fn append_readme(&self, artifact: &ReadmeArtifact) -> Result<()> {
        let mut line = serde_json::to_string(artifact)?;
        line.push('\n');
        Self::append_bytes(&self.readme_jsonl, line.as_bytes()).await
    }
}
