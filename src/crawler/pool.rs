//! Bounded worker pool for one BFS level
//!
//! [`WorkerPool::run_level`] walks a level in order and spawns one task per
//! URL, holding at most `max_concurrency` tasks in flight through a
//! semaphore. Before each dispatch it waits on the pause gate (the crawl
//! state watch channel). It returns only after every task of the level has
//! finished, so the caller sees a barrier between levels.

use crate::crawler::fetcher::{PageFetcher, PageResult};
use crate::crawler::frontier::SharedFrontier;
use crate::crawler::notify::{Notifier, ProgressEvent};
use crate::state::CrawlState;
use std::sync::Arc;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// Per-level counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LevelReport {
    /// URLs in the level
    pub urls: usize,
    /// URLs whose "started" event was emitted
    pub started: usize,
    /// URLs fetched without error
    pub completed: usize,
    /// URLs whose fetch reported an error (or whose task died)
    pub failed: usize,
    /// URLs resolved as canceled, started or not
    pub canceled: usize,
    /// Children admitted into the next level
    pub admitted: usize,
    /// Sum of matches over completed URLs
    pub matches: usize,
}

impl LevelReport {
    fn record(&mut self, outcome: UrlOutcome) {
        match outcome {
            UrlOutcome::Completed { found, admitted } => {
                self.started += 1;
                self.completed += 1;
                self.matches += found;
                self.admitted += admitted;
            }
            UrlOutcome::Failed => {
                self.started += 1;
                self.failed += 1;
            }
            UrlOutcome::Canceled { started } => {
                if started {
                    self.started += 1;
                }
                self.canceled += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UrlOutcome {
    Completed { found: usize, admitted: usize },
    Failed,
    Canceled { started: bool },
}

/// Runs BFS levels with bounded parallelism
pub struct WorkerPool {
    fetcher: Arc<dyn PageFetcher>,
    search_text: Arc<str>,
    semaphore: Arc<Semaphore>,
    state: watch::Receiver<CrawlState>,
    frontier: SharedFrontier,
}

impl WorkerPool {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        search_text: &str,
        max_concurrency: usize,
        state: watch::Receiver<CrawlState>,
        frontier: SharedFrontier,
    ) -> Self {
        Self {
            fetcher,
            search_text: Arc::from(search_text),
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            state,
            frontier,
        }
    }

    /// Processes one level and waits for all of its tasks
    pub async fn run_level(&self, urls: Vec<String>, notifier: &Notifier) -> LevelReport {
        let mut report = LevelReport {
            urls: urls.len(),
            ..LevelReport::default()
        };
        let mut gate = self.state.clone();
        let mut tasks = JoinSet::new();
        let mut pending = urls.into_iter();

        while let Some(url) = pending.next() {
            let Some(permit) = self.acquire_slot(&mut gate).await else {
                // Stopped before dispatch: this URL and the rest never start
                let abandoned = 1 + pending.len();
                tracing::debug!("Crawl stopped, abandoning {} undispatched URLs", abandoned);
                for _ in 0..abandoned {
                    report.record(UrlOutcome::Canceled { started: false });
                }
                break;
            };

            let worker = Worker {
                fetcher: Arc::clone(&self.fetcher),
                search_text: Arc::clone(&self.search_text),
                state: self.state.clone(),
                frontier: self.frontier.clone(),
                notifier: notifier.clone(),
            };

            tasks.spawn(async move {
                let outcome = worker.run(url).await;
                drop(permit);
                outcome
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    tracing::warn!("Worker task failed: {}", e);
                    report.record(UrlOutcome::Failed);
                }
            }
        }

        report
    }

    /// Waits until a URL may be dispatched
    ///
    /// Returns `None` once the crawl is stopped. A permit obtained while the
    /// crawl got paused is handed back and the wait starts over.
    async fn acquire_slot(
        &self,
        gate: &mut watch::Receiver<CrawlState>,
    ) -> Option<OwnedSemaphorePermit> {
        loop {
            let state = match gate.wait_for(|s| *s != CrawlState::Paused).await {
                Ok(state) => *state,
                Err(_) => return None,
            };
            if state == CrawlState::Stopped {
                return None;
            }

            let permit = tokio::select! {
                permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok()?,
                _ = gate.wait_for(|s| *s == CrawlState::Stopped) => return None,
            };

            if *gate.borrow() == CrawlState::Working {
                return Some(permit);
            }
        }
    }
}

/// Everything one task needs; no access to engine internals
struct Worker {
    fetcher: Arc<dyn PageFetcher>,
    search_text: Arc<str>,
    state: watch::Receiver<CrawlState>,
    frontier: SharedFrontier,
    notifier: Notifier,
}

impl Worker {
    async fn run(self, url: String) -> UrlOutcome {
        if self.is_stopped() {
            tracing::debug!("Skipping {}: crawl stopped", url);
            return UrlOutcome::Canceled { started: false };
        }

        self.notifier.send(ProgressEvent::started(&url));

        let mut result = self.fetch(&url).await;
        let canceled = self.is_stopped();
        if canceled {
            result = PageResult::canceled();
        }

        self.notifier.send(ProgressEvent::finished(&url, &result));

        if canceled {
            return UrlOutcome::Canceled { started: true };
        }

        if let Some(ref e) = result.error {
            tracing::debug!("Page {} failed: {}", url, e);
            return UrlOutcome::Failed;
        }

        let admitted = self.frontier.admit(&result.child_links);
        tracing::debug!(
            url = %url,
            found = result.match_count,
            children = result.child_links.len(),
            admitted,
            "Page finished"
        );

        UrlOutcome::Completed {
            found: result.match_count,
            admitted,
        }
    }

    /// Runs the fetch in its own task so a panicking fetcher fails one page only
    async fn fetch(&self, url: &str) -> PageResult {
        let fetcher = Arc::clone(&self.fetcher);
        let search_text = Arc::clone(&self.search_text);
        let owned_url = url.to_string();

        // Dropping the set aborts the fetch along with its worker
        let mut task = JoinSet::new();
        task.spawn(async move { fetcher.fetch(&owned_url, &search_text).await });

        match task.join_next().await {
            Some(Ok(result)) => result,
            Some(Err(e)) => {
                tracing::warn!("Fetch of {} panicked: {}", url, e);
                PageResult::failure(format!("Fetch task failed: {}", e))
            }
            None => PageResult::failure("Fetch task failed: no task"),
        }
    }

    fn is_stopped(&self) -> bool {
        *self.state.borrow() == CrawlState::Stopped
    }
}
