use serde::Deserialize;

/// Default user agent sent by the HTTP page fetcher
pub const DEFAULT_USER_AGENT: &str = concat!("web-search/", env!("CARGO_PKG_VERSION"));

/// Default request timeout for the HTTP page fetcher (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Main configuration structure for Web-Search
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Settings for one crawl session
///
/// Immutable once a [`CrawlEngine`](crate::crawler::CrawlEngine) has been
/// built from it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrawlConfig {
    /// Page the breadth-first crawl starts from
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Term counted case-insensitively on every visited page
    #[serde(rename = "search-text")]
    pub search_text: String,

    /// Maximum number of page fetches in flight at once
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: usize,

    /// Maximum number of distinct URLs admitted into the crawl
    #[serde(rename = "max-url-number")]
    pub max_url_number: usize,
}

impl CrawlConfig {
    pub fn new(
        seed_url: impl Into<String>,
        search_text: impl Into<String>,
        max_concurrency: usize,
        max_url_number: usize,
    ) -> Self {
        Self {
            seed_url: seed_url.into(),
            search_text: search_text.into(),
            max_concurrency,
            max_url_number,
        }
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// User agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
