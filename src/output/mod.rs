//! Output module for crawl results and reports
//!
//! This module handles:
//! - The `RecordSink` interface every output implements
//! - Writing a markdown digest of each run
//! - Archiving articles, digests and runs in SQLite
//! - Per-run reports and archive statistics

mod archive;
mod markdown;
mod schema;
pub mod stats;
mod traits;

pub use archive::{content_hash, RunRecord, SqliteArchive, StoredArticle};
pub use markdown::{format_markdown_digest, MarkdownDigest};
pub use stats::{load_statistics, print_report, print_statistics, ArchiveStatistics, CrawlReport};
pub use traits::{FanoutSink, JsonLinesSink, MemorySink, OutputError, OutputResult, RecordSink};

use crate::config::OutputConfig;
use std::path::Path;

/// Builds the sinks named in the output configuration
///
/// The archive, when configured, gets a run row tagged with `config_hash`
/// starting at `start_cursor`.
pub fn build_sinks(
    config: &OutputConfig,
    config_hash: &str,
    start_cursor: u64,
) -> OutputResult<FanoutSink> {
    let mut sinks = FanoutSink::new();

    if let Some(path) = &config.database_path {
        let mut archive = SqliteArchive::open(Path::new(path))?;
        archive.begin_run(config_hash, start_cursor)?;
        sinks.push(Box::new(archive));
    }

    if let Some(path) = &config.summary_path {
        sinks.push(Box::new(MarkdownDigest::new(path)));
    }

    Ok(sinks)
}
