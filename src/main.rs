//! Web-Search main entry point
//!
//! This is the command-line interface for the Web-Search site crawler.

use clap::Parser;
use parking_lot::Mutex;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use web_search::config::{load_config, validate, Config, CrawlConfig, HttpConfig};
use web_search::crawler::{CrawlEngine, HttpPageFetcher, ProgressEvent};
use web_search::output::{format_event_json, format_event_line, print_statistics, CrawlStatistics};
use web_search::ConfigError;

/// Default parallel fetches when neither flag nor config file sets one
const DEFAULT_THREADS: usize = 25;

/// Default URL budget when neither flag nor config file sets one
const DEFAULT_MAX_URLS: usize = 100;

/// Web-Search: bounded breadth-first site search
///
/// Crawls a site breadth-first from a seed page and counts case-insensitive
/// occurrences of a search term on every visited page. While running, type
/// `p` + Enter to pause, `r` to resume and `s` to stop; Ctrl-C also stops.
#[derive(Parser, Debug)]
#[command(name = "web-search")]
#[command(version)]
#[command(about = "Bounded breadth-first site search", long_about = None)]
struct Cli {
    /// Page to start crawling from
    #[arg(value_name = "SEED_URL")]
    seed_url: Option<String>,

    /// Text to count on every page
    #[arg(value_name = "SEARCH_TEXT")]
    search_text: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of parallel page fetches
    #[arg(short, long)]
    threads: Option<usize>,

    /// Maximum number of URLs to visit
    #[arg(short, long)]
    max_urls: Option<usize>,

    /// Print every progress event as a JSON line
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Commands read from stdin while a crawl runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Pause,
    Resume,
    Stop,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" => Some(Self::Pause),
            "r" | "resume" => Some(Self::Resume),
            "s" | "stop" | "q" | "quit" => Some(Self::Stop),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    match run_search(config, cli.json).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!("Search failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("web_search=info,warn"),
            1 => EnvFilter::new("web_search=debug,info"),
            2 => EnvFilter::new("web_search=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Merges the config file (if any) with command-line overrides
fn build_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)?
        }
        None => Config {
            crawl: CrawlConfig::new(
                cli.seed_url.clone().ok_or(ConfigError::Missing("seed URL"))?,
                cli.search_text
                    .clone()
                    .ok_or(ConfigError::Missing("search text"))?,
                DEFAULT_THREADS,
                DEFAULT_MAX_URLS,
            ),
            http: HttpConfig::default(),
        },
    };

    if let Some(seed_url) = &cli.seed_url {
        config.crawl.seed_url = seed_url.clone();
    }
    if let Some(search_text) = &cli.search_text {
        config.crawl.search_text = search_text.clone();
    }
    if let Some(threads) = cli.threads {
        config.crawl.max_concurrency = threads;
    }
    if let Some(max_urls) = cli.max_urls {
        config.crawl.max_url_number = max_urls;
    }

    validate(&config)?;
    Ok(config)
}

/// Runs the crawl with interactive pause/resume/stop control
async fn run_search(config: Config, json: bool) -> web_search::Result<()> {
    let fetcher = Arc::new(HttpPageFetcher::new(&config.http)?);
    let max_url_number = config.crawl.max_url_number;
    let engine = Arc::new(CrawlEngine::new(config.crawl, fetcher)?);

    let control = tokio::spawn(control_loop(Arc::clone(&engine), spawn_stdin_reader()));

    let stats = Arc::new(Mutex::new(CrawlStatistics::new()));
    let sink = Arc::clone(&stats);
    let result = engine
        .start(move |event: ProgressEvent| {
            let mut stats = sink.lock();
            stats.record(&event);

            if json {
                match format_event_json(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Failed to serialize event: {}", e),
                }
            } else if !event.loading {
                println!("{}", format_event_line(&event, stats.progress(max_url_number)));
            }
        })
        .await;

    control.abort();
    let summary = result?;

    tracing::info!(
        "Visited {} pages over {} levels ({:?})",
        summary.pages_started,
        summary.levels,
        summary.outcome
    );

    if !json {
        println!();
        print_statistics(&stats.lock());
    }

    Ok(())
}

/// Applies stdin commands and Ctrl-C to the running engine
async fn control_loop(engine: Arc<CrawlEngine>, mut commands: mpsc::UnboundedReceiver<Command>) {
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Pause) => {
                    if !engine.pause() {
                        tracing::warn!("Cannot pause while {}", engine.state());
                    }
                }
                Some(Command::Resume) => {
                    if !engine.resume() {
                        tracing::warn!("Cannot resume while {}", engine.state());
                    }
                }
                Some(Command::Stop) => engine.stop(),
                // stdin closed; only Ctrl-C is left
                None => {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        engine.stop();
                    }
                    return;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    tracing::info!("Interrupted, stopping crawl");
                    engine.stop();
                }
                return;
            }
        }
    }
}

/// Reads commands from stdin on a plain thread
///
/// A blocking stdin read would otherwise keep the runtime from shutting down.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<Command> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match Command::parse(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None => tracing::warn!("Unknown command {:?} (use p, r or s)", line.trim()),
            }
        }
    });

    rx
}
