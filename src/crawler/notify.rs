//! Progress notification channel
//!
//! Workers push [`ProgressEvent`]s from any task through a cloneable
//! [`Notifier`]. A single reader task owns the consumer callback and calls it
//! one event at a time, so the consumer never runs concurrently with itself.
//! Both events of one URL come from the same worker onto the same FIFO queue,
//! which keeps "started" ahead of "finished".

use crate::crawler::fetcher::PageResult;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Title of the event sent when a page starts loading
pub const LOADING_TITLE: &str = "Loading...";

/// Title reported for a finished page without one
pub const NO_TITLE: &str = "No Title";

/// Per-URL progress report delivered to the consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// `true` for the "started" event, `false` for "finished"
    pub loading: bool,
    pub title: String,
    pub url: String,
    /// Matches of the search term; zero while loading
    pub found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn started(url: &str) -> Self {
        Self {
            loading: true,
            title: LOADING_TITLE.to_string(),
            url: url.to_string(),
            found: 0,
            error: None,
        }
    }

    pub fn finished(url: &str, result: &PageResult) -> Self {
        let title = if result.title.is_empty() {
            NO_TITLE.to_string()
        } else {
            result.title.clone()
        };

        Self {
            loading: false,
            title,
            url: url.to_string(),
            // A failed page counts nothing, whatever the fetcher reported
            found: if result.is_error() { 0 } else { result.match_count },
            error: result.error.clone(),
        }
    }
}

/// Producer side of the channel, handed to every worker
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl Notifier {
    pub fn send(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Progress consumer is gone, dropping event");
        }
    }
}

/// Single-consumer delivery of progress events
pub struct NotificationChannel {
    notifier: Notifier,
    consumer: JoinHandle<usize>,
}

impl NotificationChannel {
    /// Spawns the reader task that feeds `on_event`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(mut on_event: F) -> Self
    where
        F: FnMut(ProgressEvent) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let consumer = tokio::spawn(async move {
            let mut delivered = 0;
            while let Some(event) = rx.recv().await {
                on_event(event);
                delivered += 1;
            }
            delivered
        });

        Self {
            notifier: Notifier { tx },
            consumer,
        }
    }

    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    /// Closes the channel and waits until every queued event is delivered
    ///
    /// Returns the number of events delivered. Every [`Notifier`] clone must
    /// have been dropped for this to complete.
    pub async fn close(self) -> usize {
        drop(self.notifier);

        match self.consumer.await {
            Ok(delivered) => delivered,
            Err(e) => {
                tracing::warn!("Progress consumer failed: {}", e);
                0
            }
        }
    }
}
