// src/state/mod.rs

//! Durable process state: the crawl checkpoint and the crawled-ID set.
//!
//! Both components load at startup, mutate in memory, and flush to disk
//! periodically and at sort/topic boundaries. Saves are atomic (write to
//! temp, then rename), so a crash never leaves a half-written file: a
//! subsequent load sees either the old state or the new one.

mod checkpoint;
mod crawled;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use crawled::CrawledIds;

use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Read a JSON file, returning `None` if it does not exist.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Write JSON atomically (write to temp, then rename).
pub(crate) async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Remove a file, treating "not found" as success.
pub(crate) async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::Io(e)),
    }
}
