//! Statistics gathered from progress events
//!
//! This module aggregates the "finished" events of a crawl into totals that
//! the CLI prints once the crawl is over.

use crate::crawler::{ProgressEvent, CANCELED};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// When the first event was recorded (or the collector was created)
    pub started_at: DateTime<Utc>,

    /// When the last event was recorded
    pub finished_at: Option<DateTime<Utc>>,

    /// Pages whose fetch finished, including failures and cancellations
    pub pages_finished: u64,

    /// Pages with at least one match
    pub pages_with_matches: u64,

    /// Matches summed over every page
    pub total_matches: u64,

    /// Pages that finished with an error other than cancellation
    pub pages_failed: u64,

    /// Pages canceled by a stop
    pub pages_canceled: u64,

    /// Error message and how many pages reported it
    pub error_summary: HashMap<String, u64>,

    /// Pages with the most matches, best first
    pub top_pages: Vec<(String, u64)>,
}

/// How many pages `top_pages` keeps
const TOP_PAGES: usize = 5;

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            pages_finished: 0,
            pages_with_matches: 0,
            total_matches: 0,
            pages_failed: 0,
            pages_canceled: 0,
            error_summary: HashMap::new(),
            top_pages: Vec::new(),
        }
    }

    /// Records one progress event; "started" events are ignored
    pub fn record(&mut self, event: &ProgressEvent) {
        if event.loading {
            return;
        }

        self.pages_finished += 1;
        self.finished_at = Some(Utc::now());

        match event.error.as_deref() {
            Some(CANCELED) => self.pages_canceled += 1,
            Some(error) => {
                self.pages_failed += 1;
                *self.error_summary.entry(error.to_string()).or_insert(0) += 1;
            }
            None => {
                let found = event.found as u64;
                self.total_matches += found;
                if found > 0 {
                    self.pages_with_matches += 1;
                    self.push_top_page(&event.url, found);
                }
            }
        }
    }

    fn push_top_page(&mut self, url: &str, found: u64) {
        self.top_pages.push((url.to_string(), found));
        self.top_pages
            .sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        self.top_pages.truncate(TOP_PAGES);
    }

    /// Elapsed time between creation and the last recorded event, in seconds
    pub fn duration_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or(self.started_at);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Fraction of the URL budget already finished, clamped to 1.0
    pub fn progress(&self, max_url_number: usize) -> f64 {
        if max_url_number == 0 {
            return 1.0;
        }
        (self.pages_finished as f64 / max_url_number as f64).min(1.0)
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Search Statistics ===\n");

    println!("Overview:");
    println!("  Pages finished: {}", stats.pages_finished);
    println!("  Pages with matches: {}", stats.pages_with_matches);
    println!("  Total matches: {}", stats.total_matches);
    println!("  Failed: {}", stats.pages_failed);
    println!("  Canceled: {}", stats.pages_canceled);
    println!("  Duration: {:.1}s", stats.duration_seconds());
    println!();

    if !stats.top_pages.is_empty() {
        println!("Top Pages:");
        for (url, found) in &stats.top_pages {
            println!("  {:>6}  {}", found, url);
        }
        println!();
    }

    if !stats.error_summary.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = stats.error_summary.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (error, count) in error_counts {
            println!("  {}: {}", error, count);
        }
        println!();
    }
}
