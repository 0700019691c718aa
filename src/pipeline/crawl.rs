// src/pipeline/crawl.rs

//! Resumable topic crawl engine.
//!
//! Walks the topic taxonomy one (topic, sort mode, page) at a time,
//! filtering candidates against the crawled-ID set, fetching and
//! validating READMEs, and persisting accepted repositories. Progress is
//! checkpointed so the crawl can stop and resume at arbitrary points.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;

use crate::client::{GraphQlClient, SearchOutcome, SortMode, TokenRotator, build_search_query};
use crate::error::Result;
use crate::models::response::RepoNode;
use crate::models::{Config, CrawlStats, DataFiles, ReadmeArtifact, RepoRecord};
use crate::pipeline::english::is_english_readme;
use crate::state::{Checkpoint, CheckpointStore, CrawledIds};
use crate::storage::{LocalSink, RepoSink};
use crate::utils::http;

/// Lower bound for the adaptive batch size.
const MIN_BATCH_SIZE: u32 = 5;
/// Batch growth per clean page.
const BATCH_GROWTH: u32 = 5;
/// Consecutive soft errors tolerated before a sort mode is abandoned.
const MAX_CONSECUTIVE_ERRORS: u32 = 5;
/// Accepted repositories between periodic state flushes.
const FLUSH_INTERVAL: usize = 10;

/// Whether to keep crawling or stop at the next safe point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Interrupted,
}

#[derive(Debug, Default)]
struct RunCounters {
    accepted: usize,
    skipped_duplicates: usize,
    skipped_no_topics: usize,
    skipped_readme: usize,
}

/// Orchestrates the paginated, multi-sort traversal across all topics.
pub struct CrawlEngine<S: RepoSink> {
    config: Arc<Config>,
    client: GraphQlClient,
    checkpoint_store: CheckpointStore,
    checkpoint: Checkpoint,
    crawled: CrawledIds,
    sink: S,
    cancel: Arc<AtomicBool>,
    counters: RunCounters,
}

impl<S: RepoSink> CrawlEngine<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        client: GraphQlClient,
        checkpoint_store: CheckpointStore,
        checkpoint: Checkpoint,
        crawled: CrawledIds,
        sink: S,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            client,
            checkpoint_store,
            checkpoint,
            crawled,
            sink,
            cancel,
            counters: RunCounters::default(),
        }
    }

    /// Crawl every topic from the checkpointed position to the end of the
    /// taxonomy. Always leaves a consistent, resumable checkpoint behind.
    pub async fn run(mut self) -> Result<CrawlStats> {
        let start_time = Utc::now();
        let topics = self.config.all_topics();

        log::info!(
            "Starting crawl over {} topics with {} token(s), {} repos already known",
            topics.len(),
            self.client.token_count(),
            self.crawled.len()
        );

        let start_index = self.checkpoint.current_topic_index;
        let mut interrupted = false;

        for (topic_index, topic) in topics.iter().enumerate().skip(start_index) {
            if self.cancelled() {
                self.flush_state().await?;
                interrupted = true;
                break;
            }

            log::info!("Topic {}/{}: {}", topic_index + 1, topics.len(), topic);
            if self.crawl_topic(topic, topic_index).await? == Flow::Interrupted {
                interrupted = true;
                break;
            }

            self.checkpoint.current_topic_index = topic_index + 1;
            self.flush_state().await?;

            if topic_index + 1 < topics.len() {
                log::debug!("Pausing between topics");
                tokio::time::sleep(Duration::from_secs(self.config.crawler.topic_pause_secs))
                    .await;
            }
        }

        if interrupted {
            log::warn!("Crawl interrupted; progress saved, run again to resume");
        } else {
            log::info!(
                "Crawl finished: {} unique repositories collected",
                self.crawled.len()
            );
        }

        Ok(CrawlStats {
            start_time,
            end_time: Utc::now(),
            accepted: self.counters.accepted,
            skipped_duplicates: self.counters.skipped_duplicates,
            skipped_no_topics: self.counters.skipped_no_topics,
            skipped_readme: self.counters.skipped_readme,
            unique_repos: self.crawled.len(),
            interrupted,
        })
    }

    /// Walk every sort mode for one topic, resuming mid-topic if the
    /// checkpoint points here.
    async fn crawl_topic(&mut self, topic: &str, topic_index: usize) -> Result<Flow> {
        let resume_sort = if self.checkpoint.current_topic_index == topic_index {
            self.checkpoint.current_sort_index
        } else {
            0
        };

        for (sort_index, sort) in SortMode::ALL.iter().enumerate().skip(resume_sort) {
            log::info!("Sorting by {}", sort.label());
            let flow = self.crawl_sort(topic, topic_index, sort_index, *sort).await?;
            self.flush_state().await?;
            if flow == Flow::Interrupted {
                return Ok(Flow::Interrupted);
            }

            // The cursor belongs to the finished (topic, sort) pair only.
            self.checkpoint.current_sort_index = sort_index;
            self.checkpoint.current_page = None;
            self.checkpoint.batch_size = self.config.crawler.batch_size;
            self.flush_state().await?;
        }

        // Next topic starts from the first sort mode and a fresh counter.
        self.checkpoint.current_sort_index = 0;
        self.checkpoint.current_page = None;
        self.checkpoint.batch_size = self.config.crawler.batch_size;
        self.checkpoint.repos_crawled_for_topic = 0;
        self.flush_state().await?;

        Ok(Flow::Continue)
    }

    /// Paginate through one (topic, sort mode) pair.
    async fn crawl_sort(
        &mut self,
        topic: &str,
        topic_index: usize,
        sort_index: usize,
        sort: SortMode,
    ) -> Result<Flow> {
        let search_query = build_search_query(topic, sort);
        log::debug!("Query: {search_query}");

        // Resume the stored cursor only when it belongs to this (topic, sort).
        let mut cursor = if self.checkpoint.current_topic_index == topic_index
            && self.checkpoint.current_sort_index == sort_index
        {
            self.checkpoint.current_page.clone()
        } else {
            None
        };

        let mut batch_size = self.checkpoint.batch_size;
        let mut accepted = 0usize;
        let mut consecutive_errors = 0u32;
        let mut has_next_page = true;
        let mut abandoned = false;

        while has_next_page && accepted < self.config.crawler.repos_per_sort {
            if self.cancelled() {
                self.flush_state().await?;
                return Ok(Flow::Interrupted);
            }

            let page = match self
                .client
                .search(&search_query, batch_size, cursor.as_deref())
                .await
            {
                Ok(SearchOutcome::Page(page)) => page,
                Ok(SearchOutcome::BatchTooLarge) => {
                    // Load problem: shrink the request, keep the cursor.
                    batch_size = (batch_size / 2).max(MIN_BATCH_SIZE);
                    self.checkpoint.batch_size = batch_size;
                    log::warn!("Query too large, reducing batch size to {batch_size}");
                    if self.soft_error(&mut consecutive_errors, sort).await {
                        abandoned = true;
                        break;
                    }
                    continue;
                }
                Err(error) => {
                    log::warn!("Page fetch failed: {error}");
                    if self.soft_error(&mut consecutive_errors, sort).await {
                        abandoned = true;
                        break;
                    }
                    continue;
                }
            };

            consecutive_errors = 0;
            has_next_page = page.page_info.has_next_page;
            cursor = page.page_info.end_cursor.clone();

            for node in page.nodes.into_iter().flatten() {
                if self.cancelled() {
                    self.flush_state().await?;
                    return Ok(Flow::Interrupted);
                }

                match self.process_candidate(&node).await {
                    Ok(true) => {
                        accepted += 1;
                        self.counters.accepted += 1;
                        self.checkpoint.current_topic_index = topic_index;
                        self.checkpoint.current_sort_index = sort_index;
                        self.checkpoint.current_page = cursor.clone();
                        self.checkpoint.repos_crawled_for_topic += 1;
                        self.checkpoint.batch_size = batch_size;

                        if accepted % FLUSH_INTERVAL == 0 {
                            self.flush_state().await?;
                        }
                        if accepted >= self.config.crawler.repos_per_sort {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(error) => {
                        log::warn!("Failed to process {}: {error}", node.name_with_owner);
                        if self.soft_error(&mut consecutive_errors, sort).await {
                            abandoned = true;
                            break;
                        }
                    }
                }
            }
            if abandoned {
                break;
            }

            // Grow the batch back toward the ceiling after a clean page.
            if consecutive_errors == 0 && batch_size < self.config.crawler.batch_size {
                batch_size = (batch_size + BATCH_GROWTH).min(self.config.crawler.batch_size);
                self.checkpoint.batch_size = batch_size;
            }

            tokio::time::sleep(Duration::from_millis(self.config.crawler.page_delay_ms)).await;
        }

        log::info!(
            "Sort {} done for {}: {} accepted this pass",
            sort.label(),
            topic,
            accepted
        );
        Ok(Flow::Continue)
    }

    /// Filter one candidate through dedup, topic, and README gates;
    /// persist it when all pass. Returns true when accepted.
    async fn process_candidate(&mut self, node: &RepoNode) -> Result<bool> {
        if self.crawled.contains(&node.id) {
            self.counters.skipped_duplicates += 1;
            return Ok(false);
        }

        let topics = node.topic_names();
        if topics.is_empty() {
            self.counters.skipped_no_topics += 1;
            return Ok(false);
        }

        let Some((owner, name)) = node.owner_and_name() else {
            log::warn!("Unexpected nameWithOwner: {}", node.name_with_owner);
            return Ok(false);
        };

        let readme = match self.fetch_readme_with_retry(owner, name).await {
            Some(text) if is_english_readme(&text) => text,
            _ => {
                self.counters.skipped_readme += 1;
                return Ok(false);
            }
        };

        let record = RepoRecord::from_node(node, topics);
        let artifact =
            ReadmeArtifact::new(record.repo_id.clone(), record.full_name.clone(), readme);
        self.sink.append_repo(&record).await?;
        self.sink.append_readme(&artifact).await?;
        self.crawled.insert(node.id.clone());

        log::debug!("Accepted {}", record.full_name);
        Ok(true)
    }

    /// Fetch a README with a bounded number of attempts.
    async fn fetch_readme_with_retry(&mut self, owner: &str, name: &str) -> Option<String> {
        let attempts = self.config.crawler.readme_attempts;
        for attempt in 1..=attempts {
            match self.client.fetch_readme(owner, name).await {
                Ok(Some(text)) if !text.is_empty() => return Some(text),
                Ok(_) => {}
                Err(error) => {
                    log::debug!("README attempt {attempt}/{attempts} for {owner}/{name}: {error}");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(Duration::from_secs(
                    self.config.crawler.readme_retry_delay_secs,
                ))
                .await;
            }
        }
        None
    }

    /// Count one soft error and back off. Returns true once the
    /// consecutive budget is exhausted and the sort mode must be abandoned.
    async fn soft_error(&self, consecutive_errors: &mut u32, sort: SortMode) -> bool {
        *consecutive_errors += 1;
        if *consecutive_errors > MAX_CONSECUTIVE_ERRORS {
            log::error!(
                "Too many consecutive errors, skipping sort mode {}",
                sort.label()
            );
            return true;
        }
        tokio::time::sleep(Duration::from_secs(self.config.crawler.error_backoff_secs)).await;
        false
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Persist checkpoint and crawled-ID set together.
    async fn flush_state(&mut self) -> Result<()> {
        self.checkpoint_store.save(&self.checkpoint).await?;
        self.crawled.save().await?;
        Ok(())
    }
}

/// Build every component from configuration and run the crawl engine.
pub async fn run_crawler(
    config: Arc<Config>,
    files: &DataFiles,
    cancel: Arc<AtomicBool>,
) -> Result<CrawlStats> {
    config.validate()?;

    let http = http::create_async_client(&config.crawler)?;
    let rotator = TokenRotator::new(
        config.credentials.tokens.clone(),
        config.crawler.rate_limit_threshold,
    );
    let client = GraphQlClient::new(http, config.crawler.api_url.clone(), rotator);

    let checkpoint_store = CheckpointStore::new(&files.checkpoint);
    let checkpoint = checkpoint_store.load(config.crawler.batch_size).await?;
    let crawled = CrawledIds::load(&files.crawled_ids).await?;
    let sink = LocalSink::new(&files.repos_csv, &files.readme_jsonl);

    let engine = CrawlEngine::new(
        config,
        client,
        checkpoint_store,
        checkpoint,
        crawled,
        sink,
        cancel,
    );
    engine.run().await
}
