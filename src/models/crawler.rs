// src/models/crawler.rs

//! Crawl run statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary of one crawl run, reported when the engine stops.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Repositories accepted and persisted during this run
    pub accepted: usize,
    /// Candidates skipped because their ID was already ingested
    pub skipped_duplicates: usize,
    /// Candidates skipped because they carry no topics
    pub skipped_no_topics: usize,
    /// Candidates skipped for a missing or non-English README
    pub skipped_readme: usize,
    /// Size of the crawled-ID set when the run stopped
    pub unique_repos: usize,
    /// Whether the run was stopped by a cancellation signal
    pub interrupted: bool,
}
