// src/models/response.rs

//! Typed views of GitHub GraphQL API responses.
//!
//! Responses are parsed into these records at the transport boundary;
//! shape mismatches surface as `AppError::MalformedResponse` instead of
//! untyped JSON propagating through the engine.

use serde::Deserialize;

/// A single GraphQL-level error entry.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
}

/// Quota probe embedded in search responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    pub remaining: u64,
    pub reset_at: String,
}

/// Envelope for the paginated search request.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEnvelope {
    #[serde(default)]
    pub data: Option<SearchData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
    #[serde(default)]
    pub search: Option<SearchPage>,
}

/// One page of search results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub repository_count: u64,
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<Option<RepoNode>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// Repository fields requested by the search projection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoNode {
    pub id: String,
    pub name: String,
    pub name_with_owner: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub primary_language: Option<Language>,
    #[serde(default)]
    pub repository_topics: Option<TopicConnection>,
    #[serde(default)]
    pub stargazer_count: u64,
    #[serde(default)]
    pub fork_count: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub url: String,
}

impl RepoNode {
    /// Topic names in API order; empty when the connection is missing.
    pub fn topic_names(&self) -> Vec<String> {
        self.repository_topics
            .as_ref()
            .map(|connection| {
                connection
                    .nodes
                    .iter()
                    .flatten()
                    .filter_map(|node| node.topic.as_ref())
                    .map(|topic| topic.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Split `owner/name` into its two parts.
    pub fn owner_and_name(&self) -> Option<(&str, &str)> {
        self.name_with_owner.split_once('/')
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Language {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicConnection {
    #[serde(default)]
    pub nodes: Vec<Option<TopicNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicNode {
    #[serde(default)]
    pub topic: Option<Topic>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topic {
    pub name: String,
}

/// Envelope for the README probe.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadmeEnvelope {
    #[serde(default)]
    pub data: Option<ReadmeData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadmeData {
    #[serde(default)]
    pub repository: Option<ReadmeVariants>,
}

/// The four filename variants probed in one round trip.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadmeVariants {
    #[serde(default)]
    pub readme: Option<Blob>,
    #[serde(default)]
    pub readme_lower: Option<Blob>,
    #[serde(default)]
    pub readme_upper: Option<Blob>,
    #[serde(default)]
    pub readme_rst: Option<Blob>,
}

impl ReadmeVariants {
    /// First non-empty variant, in the probe's priority order.
    pub fn first_text(self) -> Option<String> {
        [self.readme, self.readme_lower, self.readme_upper, self.readme_rst]
            .into_iter()
            .flatten()
            .filter_map(|blob| blob.text)
            .find(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Blob {
    #[serde(default)]
    pub text: Option<String>,
}
