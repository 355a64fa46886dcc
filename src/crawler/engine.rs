//! Crawl engine - state machine and level-by-level crawl loop
//!
//! The engine owns all shared crawl state:
//! - the crawl state, published on a watch channel that doubles as the pause
//!   gate and the cancellation flag for workers
//! - the visited set and the next-level frontier, behind one mutex
//!
//! `start` runs the BFS loop on the calling task; `pause`, `resume` and
//! `stop` may be called concurrently from any other task through a shared
//! reference (usually an `Arc<CrawlEngine>`).

use crate::config::{validate_crawl_config, CrawlConfig};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::frontier::SharedFrontier;
use crate::crawler::notify::{NotificationChannel, ProgressEvent};
use crate::crawler::pool::WorkerPool;
use crate::state::CrawlState;
use crate::{ConfigError, SearchError};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Why the crawl loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlOutcome {
    /// No admitted URLs were left to visit
    #[default]
    Exhausted,
    /// The visited set reached `max_url_number`
    CapReached,
    /// `stop` was called
    Stopped,
}

/// Totals for one crawl, returned by [`CrawlEngine::start`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// BFS levels dispatched
    pub levels: usize,
    /// URLs admitted into the crawl, seed included
    pub admitted: usize,
    /// "started" events emitted
    pub pages_started: usize,
    pub pages_completed: usize,
    pub pages_failed: usize,
    pub pages_canceled: usize,
    /// Matches summed over completed pages
    pub total_matches: usize,
    /// Events handed to the consumer
    pub events_delivered: usize,
    pub outcome: CrawlOutcome,
}

/// Bounded breadth-first crawler
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use web_search::config::{CrawlConfig, HttpConfig};
/// use web_search::crawler::{CrawlEngine, HttpPageFetcher};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CrawlConfig::new("https://example.com/", "rust", 8, 100);
/// let fetcher = Arc::new(HttpPageFetcher::new(&HttpConfig::default())?);
/// let engine = Arc::new(CrawlEngine::new(config, fetcher)?);
///
/// let summary = engine
///     .start(|event| println!("{} {} {}", event.url, event.title, event.found))
///     .await?;
/// println!("{} pages", summary.pages_started);
/// # Ok(())
/// # }
/// ```
pub struct CrawlEngine {
    config: CrawlConfig,
    fetcher: Arc<dyn PageFetcher>,
    state: watch::Sender<CrawlState>,
    frontier: SharedFrontier,
}

impl CrawlEngine {
    /// Creates an idle engine after validating `config`
    pub fn new(config: CrawlConfig, fetcher: Arc<dyn PageFetcher>) -> Result<Self, ConfigError> {
        validate_crawl_config(&config)?;

        let (state, _) = watch::channel(CrawlState::Idle);
        let frontier = SharedFrontier::new(config.max_url_number);

        Ok(Self {
            config,
            fetcher,
            state,
            frontier,
        })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn state(&self) -> CrawlState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<CrawlState> {
        self.state.subscribe()
    }

    /// Sorted copy of every URL admitted so far
    ///
    /// Empty after `stop`.
    pub fn visited_urls(&self) -> Vec<String> {
        self.frontier.visited_snapshot()
    }

    /// Runs the crawl to completion, feeding `on_event` with progress events
    ///
    /// The loop dispatches one BFS level at a time and waits for it to drain
    /// before building the next. It ends when no admitted URL is left or the
    /// crawl is stopped; every event has been delivered by the time this
    /// returns. The engine is left in [`CrawlState::Stopped`] either way.
    ///
    /// # Errors
    ///
    /// * `SearchError::Stopped` - `stop` was called before `start`, or the
    ///   engine already ran a crawl
    /// * `SearchError::AlreadyStarted` - a crawl is in progress
    pub async fn start<F>(&self, on_event: F) -> Result<CrawlSummary, SearchError>
    where
        F: FnMut(ProgressEvent) + Send + 'static,
    {
        if !self.transition(CrawlState::Working) {
            return Err(match self.state() {
                CrawlState::Stopped => SearchError::Stopped,
                other => SearchError::AlreadyStarted(other),
            });
        }

        tracing::info!(
            "Starting crawl of {} for {:?} (concurrency: {}, max URLs: {})",
            self.config.seed_url,
            self.config.search_text,
            self.config.max_concurrency,
            self.config.max_url_number
        );

        let start_time = Instant::now();
        let channel = NotificationChannel::spawn(on_event);
        let pool = WorkerPool::new(
            Arc::clone(&self.fetcher),
            &self.config.search_text,
            self.config.max_concurrency,
            self.state.subscribe(),
            self.frontier.clone(),
        );

        let mut summary = CrawlSummary::default();
        if self.frontier.seed(&self.config.seed_url) {
            summary.admitted = 1;
        }

        let mut level = self.frontier.take_next_level();
        while !level.is_empty() && !self.is_stopped() {
            summary.levels += 1;
            tracing::info!("Level {}: dispatching {} URLs", summary.levels, level.len());

            let report = pool.run_level(level, &channel.notifier()).await;

            summary.admitted += report.admitted;
            summary.pages_started += report.started;
            summary.pages_completed += report.completed;
            summary.pages_failed += report.failed;
            summary.pages_canceled += report.canceled;
            summary.total_matches += report.matches;

            tracing::info!(
                "Level {} done ({} URLs): {} completed, {} failed, {} canceled, {} admitted ({} / {} URLs)",
                summary.levels,
                report.urls,
                report.completed,
                report.failed,
                report.canceled,
                report.admitted,
                summary.admitted,
                self.config.max_url_number
            );

            level = self.frontier.take_next_level();
        }

        summary.outcome = if self.is_stopped() {
            CrawlOutcome::Stopped
        } else if self.frontier.is_full() {
            CrawlOutcome::CapReached
        } else {
            CrawlOutcome::Exhausted
        };

        // A finished crawl is as inert as a stopped one, but keeps its visited set
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = CrawlState::Stopped;
                true
            }
        });

        drop(pool);
        summary.events_delivered = channel.close().await;

        tracing::info!(
            "Crawl finished ({:?}): {} pages, {} matches in {:?}",
            summary.outcome,
            summary.pages_started,
            summary.total_matches,
            start_time.elapsed()
        );

        Ok(summary)
    }

    /// Withholds dispatch of URLs not yet started
    ///
    /// Only valid while working; returns whether the state changed.
    pub fn pause(&self) -> bool {
        let paused = self.transition(CrawlState::Paused);
        if paused {
            tracing::info!("Crawl paused");
        }
        paused
    }

    /// Continues dispatch where `pause` left off
    ///
    /// Only valid while paused; returns whether the state changed.
    pub fn resume(&self) -> bool {
        let resumed = self.transition(CrawlState::Working);
        if resumed {
            tracing::info!("Crawl resumed");
        }
        resumed
    }

    /// Cancels the crawl and discards the visited set and frontier
    ///
    /// Idempotent, and valid in every state including before `start`.
    pub fn stop(&self) {
        if self.transition(CrawlState::Stopped) {
            tracing::info!("Crawl stopped");
        }
        self.frontier.close();
    }

    fn is_stopped(&self) -> bool {
        self.state() == CrawlState::Stopped
    }

    fn transition(&self, next: CrawlState) -> bool {
        self.state.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}
