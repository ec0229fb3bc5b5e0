//! News-Sweep: a resumable sequential news crawler
//!
//! This crate walks a numbered sequence of listing pages, extracts article
//! records from each page, checkpoints its position after every productive
//! page, and hands article text to a hosted chat-completion model for
//! summarization.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod summarizer;

use thiserror::Error;

/// Main error type for News-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cursor storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector for {field}: {message}")]
    InvalidSelector { field: &'static str, message: String },

    #[error("Environment variable {0} is not set")]
    MissingApiKey(String),
}

/// Result type alias for News-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{ArticleRecord, Coordinator, PageEvent};
pub use state::{CrawlState, TerminationReason};
pub use storage::{CursorStore, FileCursorStore};
