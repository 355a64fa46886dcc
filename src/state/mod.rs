//! State module for tracking the crawl lifecycle
//!
//! # Components
//!
//! - `CrawlState`: the working/paused/stopped state machine of one crawl engine

mod crawl_state;

// Re-export main types
pub use crawl_state::CrawlState;
