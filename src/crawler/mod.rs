//! Crawler module for the bounded breadth-first search
//!
//! This module contains the core crawling logic, including:
//! - The crawl engine and its level-by-level loop
//! - The bounded worker pool that runs one level
//! - Deduplication and next-level frontier building
//! - Serialized delivery of progress events
//! - Page fetching and HTML parsing

mod engine;
mod fetcher;
mod frontier;
mod notify;
mod parser;
mod pool;

pub use engine::{CrawlEngine, CrawlOutcome, CrawlSummary};
pub use fetcher::{
    build_http_client, BlockingFetcher, HttpPageFetcher, PageFetcher, PageResult, CANCELED,
    INVALID_PAGE_ERROR, INVALID_URL_ERROR,
};
pub use frontier::{Frontier, SharedFrontier};
pub use notify::{NotificationChannel, Notifier, ProgressEvent, LOADING_TITLE, NO_TITLE};
pub use parser::{count_matches, match_link, parse_page, ParsedPage};
pub use pool::{LevelReport, WorkerPool};
