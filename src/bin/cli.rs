//! githarvest CLI
//!
//! Local execution entry point for the GitHub topic crawler.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use githarvest::{
    error::Result,
    models::Config,
    pipeline,
    state::{CheckpointStore, CrawledIds},
};

/// githarvest - GitHub Topic Crawler
#[derive(Parser, Debug)]
#[command(
    name = "githarvest",
    version,
    about = "Crawls GitHub repositories by topic and classifies them"
)]

struct Cli {
    /// Path to storage directory containing config and data files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl repositories for every configured topic
    Crawl,

    /// Classify collected repositories into taxonomy categories
    Classify,

    /// Delete the checkpoint and crawled-ID set, starting fresh
    Reset,

    /// Validate configuration files
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("githarvest starting...");

    // Load configurations
    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);

    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let config = Arc::new(config);
    let files = config.files.resolve(&cli.storage_dir);

    match cli.command {
        Command::Crawl => {
            config.validate()?;

            // First Ctrl-C asks the engine to stop at the next safe point
            // after flushing its state; the crawl resumes on the next run.
            let cancel = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&cancel);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupt received, saving progress before exit...");
                    flag.store(true, Ordering::Relaxed);
                }
            });

            let stats = pipeline::run_crawler(Arc::clone(&config), &files, cancel).await?;

            let elapsed = stats.end_time - stats.start_time;
            log::info!(
                "Run summary: {} accepted, {} duplicates, {} without topics, \
                 {} failed the README gate ({}s)",
                stats.accepted,
                stats.skipped_duplicates,
                stats.skipped_no_topics,
                stats.skipped_readme,
                elapsed.num_seconds()
            );

            if stats.interrupted {
                log::info!("Progress saved; run 'crawl' again to resume");
            } else {
                log::info!("Crawl complete!");
            }
        }

        Command::Classify => {
            pipeline::run_classifier(&config, &files)?;
            log::info!("Classification complete!");
        }

        Command::Reset => {
            CheckpointStore::new(&files.checkpoint).reset().await?;

            let mut crawled = CrawledIds::load(&files.crawled_ids).await?;
            crawled.reset().await?;

            log::info!("Checkpoint and crawled-ID set removed");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (tokens, crawler settings, and taxonomy)");

            log::info!("All validations passed!");
        }
    }

    log::info!("Done!");

    Ok(())
}
