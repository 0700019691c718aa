// src/error.rs

//! Unified error handling for the crawler application.

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV reading/writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// API response did not match the expected shape
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    /// Bounded retry budget exceeded for a single logical call
    #[error("Retries exhausted after {attempts} attempts: {context}")]
    RetriesExhausted { attempts: u32, context: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Create a retries-exhausted error.
    pub fn retries_exhausted(attempts: u32, context: impl Into<String>) -> Self {
        Self::RetriesExhausted {
            attempts,
            context: context.into(),
        }
    }
}
