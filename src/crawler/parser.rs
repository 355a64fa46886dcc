//! HTML parser for search results
//!
//! This module turns a fetched HTML document into what the crawl needs:
//! - The page title
//! - The number of case-insensitive occurrences of the search term
//! - Outbound http(s) links, in document order

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Pattern an href must contain to be followed
///
/// Only the matched part of the attribute value becomes a child link, so
/// relative hrefs are never followed and surrounding text is cut off.
const LINK_PATTERN: &str = r"\b(?i)(http|https)://([a-z0-9+&@#/%?=~_|!:,.;|]*)\b";

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Non-overlapping, case-insensitive occurrences of the search term
    pub match_count: usize,

    /// Links found on the page, duplicates included
    pub links: Vec<String>,
}

/// Parses HTML content and extracts title, match count and links
///
/// # Link Extraction Rules
///
/// - `href` attributes of every `<a>` and `<link>` element, in document order
/// - the first substring of the attribute matching an http(s) URL is kept
/// - attributes without such a substring are skipped
/// - duplicates are kept; deduplication happens when links are admitted
///
/// # Example
///
/// ```
/// use web_search::crawler::parse_page;
///
/// let html = r#"<html><head><title>Rust</title></head>
///     <body>Rust and rust. <a href="https://example.com/a">next</a></body></html>"#;
/// let parsed = parse_page(html, "RUST");
/// assert_eq!(parsed.title.as_deref(), Some("Rust"));
/// assert_eq!(parsed.match_count, 3);
/// assert_eq!(parsed.links, vec!["https://example.com/a".to_string()]);
/// ```
pub fn parse_page(html: &str, search_text: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let text: String = document.root_element().text().collect();
    let match_count = count_matches(&text, search_text);
    let links = extract_links(&document);

    ParsedPage {
        title,
        match_count,
        links,
    }
}

/// Counts non-overlapping, case-insensitive occurrences of `needle` in `haystack`
///
/// An empty needle never matches.
pub fn count_matches(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }

    haystack
        .to_lowercase()
        .matches(needle.to_lowercase().as_str())
        .count()
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href], link[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(match_link)
        .collect()
}

/// Returns the http(s) URL embedded in an href, if any
pub fn match_link(href: &str) -> Option<String> {
    link_regex().find(href).map(|m| m.as_str().to_string())
}

fn link_regex() -> &'static Regex {
    static LINK_REGEX: OnceLock<Regex> = OnceLock::new();
    LINK_REGEX.get_or_init(|| Regex::new(LINK_PATTERN).expect("link pattern is a valid regex"))
}
