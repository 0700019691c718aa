//! Pipeline entry points for crawler operations.
//!
//! - `run_crawler`: Collect repositories across the topic taxonomy
//! - `run_classifier`: Assign collected repositories to categories

pub mod classify;
pub mod crawl;
pub mod english;

pub use classify::run_classifier;
pub use crawl::run_crawler;
