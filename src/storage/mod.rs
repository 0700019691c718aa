// src/storage/mod.rs

//! Output sinks for accepted repositories.
//!
//! Two append-only sinks, written in discovery order:
//! - tabular repository records (`github_repos.csv`)
//! - README artifacts as newline-delimited JSON (`readme_data.jsonl`)

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ReadmeArtifact, RepoRecord};

// Re-export for convenience
pub use local::LocalSink;

/// Append-only sink for accepted repositories and their READMEs.
#[async_trait]
pub trait RepoSink: Send + Sync {
    /// Append one repository record to the tabular output.
    async fn append_repo(&self, record: &RepoRecord) -> Result<()>;

    /// Append one README artifact to the newline-delimited output.
    async fn append_readme(&self, artifact: &ReadmeArtifact) -> Result<()>;
}
