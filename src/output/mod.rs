//! Output module for reporting search progress
//!
//! This module handles:
//! - Rendering progress events as text lines or JSON
//! - Recording crawl statistics

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics};

use crate::crawler::ProgressEvent;

/// Renders a "finished" event as one line of text
///
/// `progress` is the fraction of the URL budget already finished.
pub fn format_event_line(event: &ProgressEvent, progress: f64) -> String {
    let status = match &event.error {
        Some(error) => format!("error: {}", error),
        None => format!("{} found", event.found),
    };

    format!(
        "[{:>5.1}%] {} | {} | {}",
        progress * 100.0,
        event.url,
        event.title,
        status
    )
}

/// Renders an event as a single JSON line
pub fn format_event_json(event: &ProgressEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}
