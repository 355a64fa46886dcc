//! Page fetchers
//!
//! The crawl engine only knows the [`PageFetcher`] trait: given a URL and a
//! search term it returns a [`PageResult`], never an error. This module holds
//! that contract plus two implementations:
//! - [`HttpPageFetcher`], which loads pages with reqwest and parses them
//! - [`BlockingFetcher`], which adapts a plain synchronous function

use crate::config::HttpConfig;
use crate::crawler::parser::parse_page;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Error (and title) reported for work discarded by a stop
pub const CANCELED: &str = "Canceled";

/// Error reported when the URL string cannot be parsed
pub const INVALID_URL_ERROR: &str = "Cannot parse URL string.";

/// Error reported when the page cannot be loaded or decoded
pub const INVALID_PAGE_ERROR: &str = "Cannot parse HTML page.";

/// Outcome of fetching and parsing one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// Page title, empty when the page has none
    pub title: String,

    /// Case-insensitive occurrences of the search term
    pub match_count: usize,

    /// Outbound links in document order
    pub child_links: Vec<String>,

    /// Failure description; `None` on success
    pub error: Option<String>,

    canceled: bool,
}

impl PageResult {
    pub fn success(title: impl Into<String>, match_count: usize, child_links: Vec<String>) -> Self {
        Self {
            title: title.into(),
            match_count,
            child_links,
            error: None,
            canceled: false,
        }
    }

    /// A failed page: empty title, no matches, no children
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Sentinel standing in for a page whose fetch was canceled
    pub fn canceled() -> Self {
        Self {
            title: CANCELED.to_string(),
            error: Some(CANCELED.to_string()),
            canceled: true,
            ..Self::default()
        }
    }

    /// True only for [`PageResult::canceled`], whatever a fetcher puts in `error`
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Fetch+parse collaborator used by the crawl engine
///
/// Implementations report every failure through [`PageResult::error`] and
/// must not panic; a panicking fetch is recorded as a failed page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, search_text: &str) -> PageResult;
}

/// Runs a synchronous fetch function on tokio's blocking thread pool
///
/// # Example
///
/// ```
/// use web_search::crawler::{BlockingFetcher, PageResult};
///
/// let fetcher = BlockingFetcher::new(|url: &str, _text: &str| {
///     PageResult::success(url, 0, Vec::new())
/// });
/// # let _ = fetcher;
/// ```
pub struct BlockingFetcher<F> {
    func: Arc<F>,
}

impl<F> BlockingFetcher<F>
where
    F: Fn(&str, &str) -> PageResult + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func: Arc::new(func),
        }
    }
}

#[async_trait]
impl<F> PageFetcher for BlockingFetcher<F>
where
    F: Fn(&str, &str) -> PageResult + Send + Sync + 'static,
{
    async fn fetch(&self, url: &str, search_text: &str) -> PageResult {
        let func = Arc::clone(&self.func);
        let url = url.to_string();
        let search_text = search_text.to_string();

        match tokio::task::spawn_blocking(move || func(&url, &search_text)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Blocking fetch task failed: {}", e);
                PageResult::failure(format!("Fetch task failed: {}", e))
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use web_search::config::HttpConfig;
/// use web_search::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Loads pages over HTTP and parses them with [`parse_page`]
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str, search_text: &str) -> PageResult {
        let parsed_url = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                tracing::debug!("Cannot parse URL {:?}: {}", url, e);
                return PageResult::failure(INVALID_URL_ERROR);
            }
        };

        let body = match fetch_body(&self.client, parsed_url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Failed to load {}: {}", url, e);
                return PageResult::failure(INVALID_PAGE_ERROR);
            }
        };

        let page = parse_page(&body, search_text);
        PageResult::success(page.title.unwrap_or_default(), page.match_count, page.links)
    }
}

async fn fetch_body(client: &Client, url: Url) -> Result<String, reqwest::Error> {
    client.get(url).send().await?.error_for_status()?.text().await
}
