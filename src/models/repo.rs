//! Repository record and README artifact structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::response::RepoNode;

/// A normalized repository record, created once when a candidate is
/// accepted and written append-only to the tabular sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoRecord {
    /// Opaque node ID from the API
    pub repo_id: String,

    /// Repository name
    pub name: String,

    /// Owner/name composite
    pub full_name: String,

    /// Description (empty string if absent)
    pub description: String,

    /// Topic names in API order
    pub topics: Vec<String>,

    /// Primary language name (empty string if absent)
    pub language: String,

    /// Star count
    pub stars_count: u64,

    /// Fork count
    pub forks_count: u64,

    /// Creation timestamp as reported by the API
    pub created_at: String,

    /// Last update timestamp as reported by the API
    pub updated_at: String,

    /// Repository URL
    pub url: String,
}

impl RepoRecord {
    /// Build a record from a search result node and its extracted topics.
    pub fn from_node(node: &RepoNode, topics: Vec<String>) -> Self {
        Self {
            repo_id: node.id.clone(),
            name: node.name.clone(),
            full_name: node.name_with_owner.clone(),
            description: node.description.clone().unwrap_or_default(),
            topics,
            language: node
                .primary_language
                .as_ref()
                .map(|l| l.name.clone())
                .unwrap_or_default(),
            stars_count: node.stargazer_count,
            forks_count: node.fork_count,
            created_at: node.created_at.clone(),
            updated_at: node.updated_at.clone(),
            url: node.url.clone(),
        }
    }

    /// Topics joined with `;` for the tabular sink.
    pub fn topics_joined(&self) -> String {
        self.topics.join(";")
    }
}

/// README text captured for an accepted repository, written append-only
/// to the newline-delimited JSON sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadmeArtifact {
    pub repo_id: String,
    pub full_name: String,
    pub readme: String,
    pub timestamp: DateTime<Utc>,
}

impl ReadmeArtifact {
    /// Create an artifact stamped with the current time.
    pub fn new(repo_id: String, full_name: String, readme: String) -> Self {
        Self {
            repo_id,
            full_name,
            readme,
            timestamp: Utc::now(),
        }
    }
}
