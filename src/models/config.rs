//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
///
/// Built once at startup and passed by reference into every component;
/// nothing reads configuration ambiently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// API credential settings
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Persisted state and output file names
    #[serde(default)]
    pub files: FilesConfig,

    /// Topic taxonomy, in priority order
    #[serde(default = "defaults::taxonomy")]
    pub taxonomy: Vec<CategoryConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.credentials.tokens.is_empty() {
            return Err(AppError::config("No API tokens configured"));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::config("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::config("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.repos_per_sort == 0 {
            return Err(AppError::config("crawler.repos_per_sort must be > 0"));
        }
        if self.crawler.batch_size == 0 {
            return Err(AppError::config("crawler.batch_size must be > 0"));
        }
        if self.crawler.readme_attempts == 0 {
            return Err(AppError::config("crawler.readme_attempts must be > 0"));
        }
        if self.taxonomy.is_empty() {
            return Err(AppError::config("No taxonomy categories defined"));
        }
        if self.taxonomy.iter().any(|c| c.topics.is_empty()) {
            return Err(AppError::config("Taxonomy category without topics"));
        }
        Ok(())
    }

    /// All topics across the taxonomy, flattened in category order.
    pub fn all_topics(&self) -> Vec<String> {
        self.taxonomy
            .iter()
            .flat_map(|c| c.topics.iter().cloned())
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            credentials: CredentialsConfig::default(),
            files: FilesConfig::default(),
            taxonomy: defaults::taxonomy(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// GraphQL endpoint URL
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Target number of accepted repositories per sort mode
    #[serde(default = "defaults::repos_per_sort")]
    pub repos_per_sort: usize,

    /// Page size seed and ceiling for search requests
    #[serde(default = "defaults::batch_size")]
    pub batch_size: u32,

    /// Remaining-quota level at which the credential is rotated
    #[serde(default = "defaults::rate_limit_threshold")]
    pub rate_limit_threshold: u64,

    /// Attempts per README fetch
    #[serde(default = "defaults::readme_attempts")]
    pub readme_attempts: u32,

    /// Delay between README fetch attempts in seconds
    #[serde(default = "defaults::readme_retry_delay")]
    pub readme_retry_delay_secs: u64,

    /// Delay between result pages in milliseconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,

    /// Delay after a failed page fetch in seconds
    #[serde(default = "defaults::error_backoff")]
    pub error_backoff_secs: u64,

    /// Pause between topics in seconds
    #[serde(default = "defaults::topic_pause")]
    pub topic_pause_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            api_url: defaults::api_url(),
            timeout_secs: defaults::timeout(),
            repos_per_sort: defaults::repos_per_sort(),
            batch_size: defaults::batch_size(),
            rate_limit_threshold: defaults::rate_limit_threshold(),
            readme_attempts: defaults::readme_attempts(),
            readme_retry_delay_secs: defaults::readme_retry_delay(),
            page_delay_ms: defaults::page_delay(),
            error_backoff_secs: defaults::error_backoff(),
            topic_pause_secs: defaults::topic_pause(),
        }
    }
}

/// API credential settings.
///
/// Tokens are tried in order; rotation is strictly round-robin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Ordered list of bearer tokens
    #[serde(default)]
    pub tokens: Vec<String>,
}

/// File names for persisted state and output sinks.
///
/// Names are resolved against the CLI storage directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "defaults::checkpoint_file")]
    pub checkpoint: String,

    #[serde(default = "defaults::crawled_ids_file")]
    pub crawled_ids: String,

    #[serde(default = "defaults::repos_csv_file")]
    pub repos_csv: String,

    #[serde(default = "defaults::readme_jsonl_file")]
    pub readme_jsonl: String,

    #[serde(default = "defaults::classified_csv_file")]
    pub classified_csv: String,

    #[serde(default = "defaults::taxonomy_json_file")]
    pub taxonomy_json: String,
}

impl FilesConfig {
    /// Resolve the configured file names against a base directory.
    pub fn resolve(&self, dir: impl AsRef<Path>) -> DataFiles {
        let dir = dir.as_ref();
        DataFiles {
            checkpoint: dir.join(&self.checkpoint),
            crawled_ids: dir.join(&self.crawled_ids),
            repos_csv: dir.join(&self.repos_csv),
            readme_jsonl: dir.join(&self.readme_jsonl),
            classified_csv: dir.join(&self.classified_csv),
            taxonomy_json: dir.join(&self.taxonomy_json),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            checkpoint: defaults::checkpoint_file(),
            crawled_ids: defaults::crawled_ids_file(),
            repos_csv: defaults::repos_csv_file(),
            readme_jsonl: defaults::readme_jsonl_file(),
            classified_csv: defaults::classified_csv_file(),
            taxonomy_json: defaults::taxonomy_json_file(),
        }
    }
}

/// Fully resolved paths for persisted state and output files.
#[derive(Debug, Clone)]
pub struct DataFiles {
    pub checkpoint: PathBuf,
    pub crawled_ids: PathBuf,
    pub repos_csv: PathBuf,
    pub readme_jsonl: PathBuf,
    pub classified_csv: PathBuf,
    pub taxonomy_json: PathBuf,
}

/// A taxonomy category and the topics that map into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Category name (e.g., "AI_DataScience")
    pub name: String,

    /// Topics queried and scored for this category
    pub topics: Vec<String>,
}

mod defaults {
    use super::CategoryConfig;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; githarvest/0.1)".into()
    }
    pub fn api_url() -> String {
        "https://api.github.com/graphql".into()
    }
    pub fn timeout() -> u64 {
        60
    }
    pub fn repos_per_sort() -> usize {
        500
    }
    pub fn batch_size() -> u32 {
        20
    }
    pub fn rate_limit_threshold() -> u64 {
        100
    }
    pub fn readme_attempts() -> u32 {
        3
    }
    pub fn readme_retry_delay() -> u64 {
        2
    }
    pub fn page_delay() -> u64 {
        1000
    }
    pub fn error_backoff() -> u64 {
        10
    }
    pub fn topic_pause() -> u64 {
        5
    }

    // File defaults
    pub fn checkpoint_file() -> String {
        "checkpoint.json".into()
    }
    pub fn crawled_ids_file() -> String {
        "crawled_repos.json".into()
    }
    pub fn repos_csv_file() -> String {
        "github_repos.csv".into()
    }
    pub fn readme_jsonl_file() -> String {
        "readme_data.jsonl".into()
    }
    pub fn classified_csv_file() -> String {
        "github_repos_classified.csv".into()
    }
    pub fn taxonomy_json_file() -> String {
        "taxonomy_mapping.json".into()
    }

    fn category(name: &str, topics: [&str; 5]) -> CategoryConfig {
        CategoryConfig {
            name: name.to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    // Taxonomy defaults: 10 category groups, 5 topics each.
    pub fn taxonomy() -> Vec<CategoryConfig> {
        vec![
            category(
                "AI_DataScience",
                [
                    "machine-learning",
                    "deep-learning",
                    "artificial-intelligence",
                    "data-science",
                    "nlp",
                ],
            ),
            category(
                "WebDevelopment",
                ["web", "frontend", "backend", "javascript", "react"],
            ),
            category(
                "MobileDevelopment",
                ["android", "ios", "flutter", "react-native", "swift"],
            ),
            category(
                "DevOpsCloud",
                ["devops", "docker", "kubernetes", "aws", "ci-cd"],
            ),
            category(
                "DatabasesDataEng",
                ["sql", "database", "nosql", "mongodb", "postgresql"],
            ),
            category(
                "SecurityCrypto",
                [
                    "security",
                    "cybersecurity",
                    "penetration-testing",
                    "cryptography",
                    "malware",
                ],
            ),
            category(
                "ProgrammingLangs",
                ["python", "java", "cplusplus", "go", "rust"],
            ),
            category(
                "SystemsInfra",
                [
                    "linux",
                    "operating-system",
                    "distributed-systems",
                    "networking",
                    "compiler",
                ],
            ),
            category(
                "EmergingTech",
                ["blockchain", "web3", "cryptocurrency", "robotics", "ar"],
            ),
            category(
                "SoftwareEngTools",
                [
                    "testing",
                    "github-actions",
                    "vscode-extension",
                    "automation",
                    "monitoring",
                ],
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token() -> Config {
        let mut config = Config::default();
        config.credentials.tokens = vec!["token-a".to_string()];
        config
    }

    #[test]
    fn validate_rejects_missing_tokens() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_default_config_with_token() {
        assert!(config_with_token().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = config_with_token();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_repos_per_sort() {
        let mut config = config_with_token();
        config.crawler.repos_per_sort = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_taxonomy_has_fifty_topics() {
        let config = Config::default();
        assert_eq!(config.taxonomy.len(), 10);
        assert_eq!(config.all_topics().len(), 50);
        assert_eq!(config.all_topics()[0], "machine-learning");
    }

    #[test]
    fn files_resolve_joins_directory() {
        let files = FilesConfig::default().resolve("data");
        assert_eq!(files.checkpoint, PathBuf::from("data/checkpoint.json"));
        assert_eq!(files.repos_csv, PathBuf::from("data/github_repos.csv"));
    }
}
