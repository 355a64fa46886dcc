use crate::config::types::{Config, CrawlConfig, HttpConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_http_config(&config.http)?;
    Ok(())
}

/// Validates the settings of one crawl session
///
/// The seed is only required to be non-empty. Whether it parses as a URL is
/// the page fetcher's concern and is reported through the first progress
/// event, not here.
pub fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.seed_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "seed_url cannot be empty".to_string(),
        ));
    }

    if config.search_text.is_empty() {
        return Err(ConfigError::Validation(
            "search_text cannot be empty".to_string(),
        ));
    }

    if config.max_concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be >= 1, got {}",
            config.max_concurrency
        )));
    }

    if config.max_url_number < 1 {
        return Err(ConfigError::Validation(format!(
            "max_url_number must be >= 1, got {}",
            config.max_url_number
        )));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}
