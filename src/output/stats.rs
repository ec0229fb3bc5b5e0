//! Crawl reports and archive statistics
//!
//! This module provides the per-run report assembled while crawling and
//! the aggregate statistics read back from the SQLite archive.

use crate::output::archive::{RunRecord, SqliteArchive};
use crate::output::traits::OutputResult;
use crate::state::{EmptyReason, TerminationReason};
use crate::summarizer::Summary;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// What happened during one crawl run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Cursor the run started from
    pub start_cursor: u64,

    /// Cursor a following run will start from
    pub resume_cursor: u64,

    /// Pages that yielded at least one record
    pub productive_pages: u64,

    /// Empty pages keyed by the kind of emptiness
    pub empty_pages: BTreeMap<String, u64>,

    /// Records handed to the output sinks
    pub records: u64,

    /// Containers dropped because no field could be found
    pub skipped_containers: u64,

    /// Summaries produced (per article or bulk)
    pub summaries: u64,

    /// Summaries where at least one model call failed
    pub degraded_summaries: u64,

    pub termination: Option<TerminationReason>,
}

impl CrawlReport {
    /// Starts a report for a run beginning at `start_cursor`
    pub fn begin(start_cursor: u64) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            start_cursor,
            resume_cursor: start_cursor,
            productive_pages: 0,
            empty_pages: BTreeMap::new(),
            records: 0,
            skipped_containers: 0,
            summaries: 0,
            degraded_summaries: 0,
            termination: None,
        }
    }

    pub fn record_productive_page(&mut self, records: usize, skipped: usize) {
        self.productive_pages += 1;
        self.records += records as u64;
        self.skipped_containers += skipped as u64;
    }

    pub fn record_empty_page(&mut self, reason: &EmptyReason) {
        *self.empty_pages.entry(reason.kind().to_string()).or_insert(0) += 1;
    }

    pub fn record_summary(&mut self, summary: &Summary) {
        self.summaries += 1;
        if summary.is_degraded() {
            self.degraded_summaries += 1;
        }
    }

    /// Marks the run as stopped
    pub fn finish(&mut self, reason: TerminationReason, resume_cursor: u64) {
        self.finished_at = Some(Utc::now());
        self.termination = Some(reason);
        self.resume_cursor = resume_cursor;
    }

    pub fn empty_page_count(&self) -> u64 {
        self.empty_pages.values().sum()
    }

    /// Pages requested during the run, productive or not
    pub fn pages_fetched(&self) -> u64 {
        self.productive_pages + self.empty_page_count()
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Prints a run report to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Run:");
    println!("  Started: {}", report.started_at.to_rfc3339());
    if let Some(finished) = report.finished_at {
        println!("  Finished: {}", finished.to_rfc3339());
    }
    if let Some(duration) = report.duration_seconds() {
        println!("  Duration: {} seconds", duration);
    }
    if let Some(reason) = report.termination {
        println!("  Stopped: {}", reason);
    }
    println!(
        "  Cursor: {} -> {}",
        report.start_cursor, report.resume_cursor
    );
    println!();

    println!("Pages:");
    println!("  Fetched: {}", report.pages_fetched());
    println!("  Productive: {}", report.productive_pages);
    for (kind, count) in &report.empty_pages {
        println!("  Empty ({}): {}", kind, count);
    }
    println!();

    println!("Articles:");
    println!("  Extracted: {}", report.records);
    if report.skipped_containers > 0 {
        println!("  Skipped containers: {}", report.skipped_containers);
    }
    if report.summaries > 0 {
        println!(
            "  Summaries: {} ({} degraded)",
            report.summaries, report.degraded_summaries
        );
    }
}

/// Aggregate counts over everything in an archive
#[derive(Debug, Clone)]
pub struct ArchiveStatistics {
    pub total_runs: u64,
    pub total_articles: u64,

    /// Distinct listing pages articles came from
    pub distinct_pages: u64,

    pub total_digests: u64,

    /// Runs grouped by how they stopped
    pub runs_by_termination: BTreeMap<String, u64>,

    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from an archive
pub fn load_statistics(archive: &SqliteArchive) -> OutputResult<ArchiveStatistics> {
    Ok(ArchiveStatistics {
        total_runs: archive.count_runs()?,
        total_articles: archive.count_articles()?,
        distinct_pages: archive.count_distinct_pages()?,
        total_digests: archive.count_digests()?,
        runs_by_termination: archive.runs_by_termination()?,
        latest_run: archive.latest_run()?,
    })
}

/// Prints archive statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ArchiveStatistics) {
    println!("=== Archive Statistics ===\n");

    println!("Overview:");
    println!("  Runs: {}", stats.total_runs);
    println!("  Articles: {}", stats.total_articles);
    println!("  Listing pages: {}", stats.distinct_pages);
    println!("  Digests: {}", stats.total_digests);
    println!();

    if !stats.runs_by_termination.is_empty() {
        println!("Runs by Outcome:");
        let mut counts: Vec<_> = stats.runs_by_termination.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1));
        for (termination, count) in counts {
            println!("  {}: {}", termination, count);
        }
        println!();
    }

    if let Some(run) = &stats.latest_run {
        println!("Latest Run (#{}):", run.id);
        println!("  Started: {}", run.started_at);
        match &run.finished_at {
            Some(finished) => println!("  Finished: {}", finished),
            None => println!("  Finished: never (interrupted)"),
        }
        println!("  Pages fetched: {}", run.pages_fetched);
        println!("  Articles: {}", run.articles);
        if let Some(cursor) = run.resume_cursor {
            println!("  Resume cursor: {}", cursor);
        }
    }
}
