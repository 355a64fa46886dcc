//! Web-Search: a bounded breadth-first site search
//!
//! This crate crawls a site breadth-first from a seed page, counting
//! case-insensitive occurrences of a search term on every visited page. The
//! crawl is capped both in total pages and in simultaneous fetches, and can be
//! paused, resumed and stopped while it streams per-page progress events.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for Web-Search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Crawl already started (state: {0:?})")]
    AlreadyStarted(state::CrawlState),

    #[error("Crawl engine has been stopped")]
    Stopped,
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

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// Result type alias for Web-Search operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, CrawlConfig};
pub use crawler::{CrawlEngine, CrawlSummary, PageFetcher, PageResult, ProgressEvent};
pub use state::CrawlState;
