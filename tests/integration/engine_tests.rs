//! End-to-end crawl engine tests against in-memory sites

use crate::support::{assert_event_order, MapSite, Recorder, TreeSite};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use web_search::config::{CrawlConfig, HttpConfig};
use web_search::crawler::{
    CrawlEngine, CrawlOutcome, HttpPageFetcher, PageFetcher, CANCELED, INVALID_URL_ERROR,
};
use web_search::{CrawlState, SearchError};

const SEED: &str = "https://example.com/";

fn engine_for(site: Arc<dyn PageFetcher>, seed: &str, threads: usize, max_urls: usize) -> Arc<CrawlEngine> {
    let config = CrawlConfig::new(seed, "rust", threads, max_urls);
    Arc::new(CrawlEngine::new(config, site).expect("valid config"))
}

async fn within<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("operation timed out")
}

#[tokio::test]
async fn test_cap_of_one_fetches_only_the_seed() {
    let site = Arc::new(MapSite::new().page(
        SEED,
        "Home",
        3,
        &["https://example.com/a", "https://example.com/b", "https://example.com/c"],
    ));
    let engine = engine_for(site.clone(), SEED, 4, 1);
    let recorder = Recorder::new();

    let summary = engine.start(recorder.sink()).await.unwrap();

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert!(events[0].loading);
    assert_eq!(events[0].title, "Loading...");
    assert!(!events[1].loading);
    assert_eq!(events[1].title, "Home");
    assert_eq!(events[1].found, 3);

    assert_eq!(site.calls(), vec![SEED.to_string()]);
    assert_eq!(engine.visited_urls(), vec![SEED.to_string()]);
    assert_eq!(summary.levels, 1);
    assert_eq!(summary.admitted, 1);
    assert_eq!(summary.outcome, CrawlOutcome::CapReached);
}

#[tokio::test]
async fn test_unparseable_seed_ends_after_one_level() {
    let fetcher = Arc::new(HttpPageFetcher::new(&HttpConfig::default()).unwrap());
    let engine = engine_for(fetcher, "not a url at all", 2, 10);
    let recorder = Recorder::new();

    let summary = engine.start(recorder.sink()).await.unwrap();

    let finished = recorder.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].error.as_deref(), Some(INVALID_URL_ERROR));
    assert_eq!(finished[0].found, 0);
    assert_eq!(finished[0].title, "No Title");
    assert_eq!(summary.levels, 1);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.outcome, CrawlOutcome::Exhausted);
}

#[tokio::test]
async fn test_budget_admits_first_children_in_discovery_order() {
    let children = [
        "https://example.com/1",
        "https://example.com/2",
        "https://example.com/3",
        "https://example.com/4",
        "https://example.com/5",
    ];
    let mut site = MapSite::new().page(SEED, "Home", 0, &children);
    for child in &children {
        site = site.page(child, "Child", 1, &[]);
    }
    let site = Arc::new(site);
    let engine = engine_for(site.clone(), SEED, 2, 4);
    let recorder = Recorder::new();

    let summary = engine.start(recorder.sink()).await.unwrap();

    let fetched: HashSet<String> = site.calls().into_iter().collect();
    let expected: HashSet<String> = [SEED, children[0], children[1], children[2]]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(fetched, expected);

    let mut visited = engine.visited_urls();
    visited.sort();
    let mut expected: Vec<String> = expected.into_iter().collect();
    expected.sort();
    assert_eq!(visited, expected);

    assert!(recorder.finished_for(children[3]).is_none());
    assert!(recorder.finished_for(children[4]).is_none());
    assert_eq!(summary.levels, 2);
    assert_eq!(summary.total_matches, 3);
    assert_eq!(summary.outcome, CrawlOutcome::CapReached);
}

#[tokio::test]
async fn test_stop_cancels_in_flight_and_queued_work() {
    let children = [
        "https://example.com/1",
        "https://example.com/2",
        "https://example.com/3",
        "https://example.com/4",
        "https://example.com/5",
    ];
    let mut site = MapSite::new()
        .page(SEED, "Home", 0, &children)
        .blocking(&children);
    for child in &children {
        site = site.page(child, "Child", 1, &["https://example.com/deeper"]);
    }
    let site = Arc::new(site);
    let engine = engine_for(site.clone(), SEED, 3, 100);
    let recorder = Recorder::new();

    let run = tokio::spawn({
        let engine = Arc::clone(&engine);
        let sink = recorder.sink();
        async move { engine.start(sink).await }
    });

    // Wait until three children are inside the fetcher
    let entered = within(site.entered.acquire_many(3)).await.unwrap();
    entered.forget();

    engine.stop();
    assert_eq!(engine.state(), CrawlState::Stopped);
    site.release.add_permits(10);

    let summary = within(run).await.unwrap().unwrap();

    // Seed plus the three in-flight children; the other two never reached the fetcher
    assert_eq!(site.calls().len(), 4);

    let canceled: Vec<_> = recorder
        .finished()
        .into_iter()
        .filter(|e| e.error.as_deref() == Some(CANCELED))
        .collect();
    assert_eq!(canceled.len(), 3);
    for event in &canceled {
        assert_eq!(event.found, 0);
    }
    assert_eq!(recorder.started().len(), 4);

    assert_eq!(summary.levels, 2);
    assert_eq!(summary.pages_canceled, 5);
    assert_eq!(summary.outcome, CrawlOutcome::Stopped);
    assert!(!site.calls().contains(&"https://example.com/deeper".to_string()));
    assert!(engine.visited_urls().is_empty());
    assert_event_order(&recorder.events());
}

#[tokio::test]
async fn test_stop_is_terminal() {
    let site = Arc::new(MapSite::new().page(SEED, "Home", 0, &[]));
    let engine = engine_for(site.clone(), SEED, 1, 10);

    engine.stop();
    assert!(!engine.pause());
    assert!(!engine.resume());
    engine.stop();
    assert_eq!(engine.state(), CrawlState::Stopped);

    let result = engine.start(Recorder::new().sink()).await;
    assert!(matches!(result, Err(SearchError::Stopped)));
    assert!(site.calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_start_is_rejected() {
    let site = Arc::new(
        MapSite::new()
            .page(SEED, "Home", 0, &[])
            .blocking(&[SEED]),
    );
    let engine = engine_for(site.clone(), SEED, 1, 10);

    let run = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.start(|_| {}).await }
    });
    within(site.entered.acquire()).await.unwrap().forget();

    let second = engine.start(|_| {}).await;
    assert!(matches!(
        second,
        Err(SearchError::AlreadyStarted(CrawlState::Working))
    ));

    site.release.add_permits(1);
    let summary = within(run).await.unwrap().unwrap();
    assert_eq!(summary.pages_completed, 1);
}

#[tokio::test]
async fn test_visit_cap_and_unique_starts_under_concurrency() {
    let site = Arc::new(TreeSite {
        root: SEED.to_string(),
        fan_out: 4,
        delay: Duration::from_millis(1),
    });
    let engine = engine_for(site, SEED, 8, 30);
    let recorder = Recorder::new();

    let summary = engine.start(recorder.sink()).await.unwrap();

    let events = recorder.events();
    assert_event_order(&events);

    let started = recorder.started();
    let unique: HashSet<_> = started.iter().collect();
    assert_eq!(unique.len(), started.len());
    assert_eq!(started.len(), 30);
    assert_eq!(recorder.finished().len(), 30);

    assert_eq!(engine.visited_urls().len(), 30);
    assert_eq!(summary.admitted, 30);
    assert_eq!(summary.events_delivered, 60);
    assert_eq!(summary.outcome, CrawlOutcome::CapReached);
    assert_eq!(engine.state(), CrawlState::Stopped);
}

#[tokio::test]
async fn test_pause_withholds_dispatch_and_resume_matches_uninterrupted_run() {
    let site = || {
        Arc::new(TreeSite {
            root: SEED.to_string(),
            fan_out: 3,
            delay: Duration::from_millis(5),
        })
    };

    // Uninterrupted reference run
    let reference = engine_for(site(), SEED, 1, 20);
    let reference_events = Recorder::new();
    reference.start(reference_events.sink()).await.unwrap();

    // Same crawl with a pause in the middle
    let engine = engine_for(site(), SEED, 1, 20);
    let recorder = Recorder::new();
    let run = tokio::spawn({
        let engine = Arc::clone(&engine);
        let sink = recorder.sink();
        async move { engine.start(sink).await }
    });

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(engine.pause());
    assert_eq!(engine.state(), CrawlState::Paused);

    // Let whatever was in flight drain, then make sure nothing new starts
    tokio::time::sleep(Duration::from_millis(50)).await;
    let started_while_paused = recorder.started().len();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(recorder.started().len(), started_while_paused);
    assert!(started_while_paused < 20);

    assert!(engine.resume());
    let summary = within(run).await.unwrap().unwrap();

    assert_eq!(summary.outcome, CrawlOutcome::CapReached);
    assert_eq!(engine.visited_urls(), reference.visited_urls());

    let mut expected = reference_events.events();
    let mut actual = recorder.events();
    expected.sort_by(|a, b| (&a.url, a.loading).cmp(&(&b.url, b.loading)));
    actual.sort_by(|a, b| (&a.url, a.loading).cmp(&(&b.url, b.loading)));
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_page_failures_do_not_abort_the_crawl() {
    let site = Arc::new(
        MapSite::new()
            .page(
                SEED,
                "Home",
                1,
                &[
                    "https://example.com/broken",
                    "https://example.com/panics",
                    "https://example.com/ok",
                ],
            )
            .failing("https://example.com/broken", "Cannot parse HTML page.")
            .page("https://example.com/ok", "", 2, &[])
            .panicking("https://example.com/panics"),
    );
    let engine = engine_for(site, SEED, 3, 10);
    let recorder = Recorder::new();

    let summary = engine.start(recorder.sink()).await.unwrap();

    let broken = recorder.finished_for("https://example.com/broken").unwrap();
    assert_eq!(broken.error.as_deref(), Some("Cannot parse HTML page."));
    assert_eq!(broken.found, 0);

    let panicked = recorder.finished_for("https://example.com/panics").unwrap();
    assert!(panicked.error.is_some());
    assert_ne!(panicked.error.as_deref(), Some(CANCELED));

    let ok = recorder.finished_for("https://example.com/ok").unwrap();
    assert_eq!(ok.title, "No Title");
    assert_eq!(ok.found, 2);

    assert_eq!(summary.pages_completed, 2);
    assert_eq!(summary.pages_failed, 2);
    assert_eq!(summary.total_matches, 3);
    assert_eq!(summary.outcome, CrawlOutcome::Exhausted);
}

#[tokio::test]
async fn test_stop_while_paused_releases_start() {
    let children = [
        "https://example.com/1",
        "https://example.com/2",
        "https://example.com/3",
        "https://example.com/4",
    ];
    let mut site = MapSite::new()
        .page(SEED, "Home", 0, &children)
        .blocking(&children[..1]);
    for child in &children {
        site = site.page(child, "Child", 1, &[]);
    }
    let site = Arc::new(site);
    let engine = engine_for(site.clone(), SEED, 1, 100);
    let recorder = Recorder::new();

    let run = tokio::spawn({
        let engine = Arc::clone(&engine);
        let sink = recorder.sink();
        async move { engine.start(sink).await }
    });

    within(site.entered.acquire()).await.unwrap().forget();
    assert!(engine.pause());

    // The in-flight page still finishes; its slot is then held back by the pause
    site.release.add_permits(1);
    within(async {
        while recorder.finished_for(children[0]).is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(site.calls().len(), 2);

    engine.stop();
    let summary = within(run).await.unwrap().unwrap();

    assert_eq!(summary.outcome, CrawlOutcome::Stopped);
    assert_eq!(engine.state(), CrawlState::Stopped);
    assert_eq!(site.calls(), vec![SEED.to_string(), children[0].to_string()]);
    assert_eq!(summary.pages_completed, 2);
    assert_eq!(summary.pages_canceled, 3);
    assert_eq!(recorder.started().len(), 2);
    assert_event_order(&recorder.events());
}

#[tokio::test]
async fn test_failed_page_reports_no_matches_and_no_children() {
    let site = Arc::new(
        MapSite::new()
            .broken(SEED, "boom", 7, &["https://example.com/kid"])
            .page("https://example.com/kid", "Kid", 1, &[]),
    );
    let engine = engine_for(site.clone(), SEED, 2, 10);
    let recorder = Recorder::new();

    let summary = engine.start(recorder.sink()).await.unwrap();

    let seed = recorder.finished_for(SEED).unwrap();
    assert_eq!(seed.error.as_deref(), Some("boom"));
    assert_eq!(seed.found, 0);

    assert_eq!(site.calls(), vec![SEED.to_string()]);
    assert_eq!(engine.visited_urls(), vec![SEED.to_string()]);
    assert_eq!(summary.levels, 1);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.total_matches, 0);
    assert_eq!(summary.outcome, CrawlOutcome::Exhausted);
}

#[tokio::test]
async fn test_fetcher_error_spelled_canceled_is_still_a_failure() {
    let site = Arc::new(MapSite::new().failing(SEED, CANCELED));
    let engine = engine_for(site, SEED, 1, 10);

    let summary = engine.start(Recorder::new().sink()).await.unwrap();

    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.pages_canceled, 0);
    assert_eq!(summary.outcome, CrawlOutcome::Exhausted);
}
