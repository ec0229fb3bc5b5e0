//! News-Sweep main entry point
//!
//! This is the command-line interface for the News-Sweep sequential crawler.

use anyhow::{bail, Context};
use clap::Parser;
use news_sweep::config::{load_config_with_hash, Config, SummaryMode};
use news_sweep::crawler::{build_page_url, Coordinator};
use news_sweep::output::{
    build_sinks, load_statistics, print_report, print_statistics, JsonLinesSink, RecordSink,
    SqliteArchive,
};
use news_sweep::state::MAX_SEQUENCE;
use news_sweep::storage::{load_position, open_cursor_store, CursorLease, CursorStore};
use news_sweep::summarizer::SummaryPipeline;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// News-Sweep: a resumable sequential news crawler
///
/// News-Sweep walks numbered listing pages of a news site, extracts the
/// articles on each page, remembers where it stopped, and optionally has a
/// hosted chat model summarize what it found.
#[derive(Parser, Debug)]
#[command(name = "news-sweep")]
#[command(version)]
#[command(about = "A resumable sequential news crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start from page 0, ignoring the stored cursor
    #[arg(long, conflicts_with = "start_at")]
    fresh: bool,

    /// Start from this page, ignoring the stored cursor
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(..=MAX_SEQUENCE))]
    start_at: Option<u64>,

    /// Validate config and show where the crawl would start without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the article archive and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Remove a lock left behind by a crashed run
    #[arg(long)]
    force_unlock: bool,

    /// Print every article as a JSON line on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        return handle_stats(&config);
    }

    let start_override = if cli.fresh { Some(0) } else { cli.start_at };

    if cli.dry_run {
        return handle_dry_run(&config, start_override);
    }

    handle_crawl(&config, &config_hash, start_override, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("news_sweep=info,warn"),
            1 => EnvFilter::new("news_sweep=debug,info"),
            2 => EnvFilter::new("news_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: validates config and shows where the crawl would start
fn handle_dry_run(config: &Config, start_override: Option<u64>) -> anyhow::Result<()> {
    println!("=== News-Sweep Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  URL template: {}", config.crawler.base_url_template);
    println!("  Max empty retries: {}", config.crawler.max_empty_retries);
    println!(
        "  Inter-request delay: {}ms",
        config.crawler.inter_request_delay_ms
    );
    println!(
        "  Empty-page delay: {}ms (max {}ms)",
        config.crawler.empty_page_delay_ms, config.crawler.max_empty_page_delay_ms
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    if let Some(max_pages) = config.crawler.max_pages {
        println!("  Max pages: {}", max_pages);
    }
    if let Some(seconds) = config.crawler.max_run_seconds {
        println!("  Max run time: {}s", seconds);
    }

    println!("\nSelectors:");
    println!("  Container: {}", config.selectors.container);
    println!("  Title: {}", config.selectors.title);
    println!("  Time: {}", config.selectors.time);
    println!("  Body: {}", config.selectors.body);

    println!("\nSummarizer:");
    println!("  Mode: {}", config.summarizer.mode.as_str());
    if config.summarizer.mode != SummaryMode::Off {
        println!("  Endpoint: {}", config.summarizer.endpoint);
        println!("  Model: {}", config.summarizer.model);
        let key_set = std::env::var(&config.summarizer.api_key_env).is_ok();
        println!(
            "  API key ({}): {}",
            config.summarizer.api_key_env,
            if key_set { "set" } else { "NOT SET" }
        );
    }

    println!("\nOutput:");
    println!(
        "  Database: {}",
        config.output.database_path.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Digest: {}",
        config.output.summary_path.as_deref().unwrap_or("(none)")
    );

    let store = open_cursor_store(Path::new(&config.cursor.path));
    let stored = load_position(&store)?;
    let start = start_override.unwrap_or(stored);
    let first_url = build_page_url(&config.crawler.base_url_template, start)
        .context("URL template has no page number")?;

    println!("\nCursor ({}):", store.location());
    println!("  Stored: {}", stored);
    if start_override.is_some() {
        println!("  Overridden to: {}", start);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", first_url);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the archive
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let Some(path) = &config.output.database_path else {
        bail!("No database-path configured in [output]");
    };

    println!("Database: {}\n", path);

    let archive = SqliteArchive::open(Path::new(path))?;
    let stats = load_statistics(&archive)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    start_override: Option<u64>,
    cli: &Cli,
) -> anyhow::Result<()> {
    let cursor_path = Path::new(&config.cursor.path);

    if cli.force_unlock && CursorLease::force_release(cursor_path)? {
        tracing::warn!("Removed stale lock for {}", cursor_path.display());
    }
    let _lease = CursorLease::acquire(cursor_path)?;

    if let Some(start) = start_override {
        tracing::info!("Overriding stored cursor with page {}", start);
        open_cursor_store(cursor_path).save(start)?;
    }

    let summaries = SummaryPipeline::from_config(&config.summarizer)?;

    let cancel = CancellationToken::new();
    let mut coordinator = Coordinator::from_config(config)?.with_cancellation(cancel.clone());

    let mut sinks = build_sinks(&config.output, config_hash, coordinator.cursor())?;
    if cli.json {
        sinks.push(Box::new(JsonLinesSink));
    }
    if sinks.is_empty() {
        tracing::warn!("No output configured; articles are only counted");
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            cancel.cancel();
        }
    });

    let report = coordinator
        .run(&mut sinks as &mut dyn RecordSink, summaries.as_ref())
        .await
        .context("Crawl failed")?;

    if !cli.quiet {
        print_report(&report);
    }

    Ok(())
}
