//! Configuration module for Web-Search
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use web_search::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("search.toml")).unwrap();
//! println!("Crawl will visit at most {} pages", config.crawl.max_url_number);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, HttpConfig, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

// Re-export parser and validation functions
pub use parser::{load_config, parse_config};
pub use validation::{validate, validate_crawl_config};
