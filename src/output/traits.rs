//! Output sink traits and in-memory sinks
//!
//! This module defines the trait interface for everything that receives
//! crawl results, plus the simple sinks built on it.

use crate::crawler::ArticleRecord;
use crate::output::stats::CrawlReport;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No crawl run has been started in the archive")]
    NoActiveRun,

    #[error("{field} value {value} does not fit in an SQLite integer")]
    OutOfRange { field: &'static str, value: u64 },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Receives crawl results as they are produced
///
/// Calls arrive in crawl order: every article of a page before the next page,
/// the bulk digest (if any) after the last article, `finalize` last.
pub trait RecordSink {
    /// Records one extracted article with its summary, if one was made
    fn record_article(&mut self, article: &ArticleRecord, summary: Option<&str>)
        -> OutputResult<()>;

    /// Records the summary of all article text of the run
    fn record_digest(&mut self, digest: &str) -> OutputResult<()>;

    /// Called once after the crawl stopped
    fn finalize(&mut self, report: &CrawlReport) -> OutputResult<()>;
}

/// Keeps everything in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub articles: Vec<(ArticleRecord, Option<String>)>,
    pub digests: Vec<String>,
    pub finalized: Option<CrawlReport>,
}

impl RecordSink for MemorySink {
    fn record_article(
        &mut self,
        article: &ArticleRecord,
        summary: Option<&str>,
    ) -> OutputResult<()> {
        self.articles
            .push((article.clone(), summary.map(str::to_string)));
        Ok(())
    }

    fn record_digest(&mut self, digest: &str) -> OutputResult<()> {
        self.digests.push(digest.to_string());
        Ok(())
    }

    fn finalize(&mut self, report: &CrawlReport) -> OutputResult<()> {
        self.finalized = Some(report.clone());
        Ok(())
    }
}

/// Forwards every call to several sinks, in order
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn RecordSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn RecordSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RecordSink for FanoutSink {
    fn record_article(
        &mut self,
        article: &ArticleRecord,
        summary: Option<&str>,
    ) -> OutputResult<()> {
        for sink in &mut self.sinks {
            sink.record_article(article, summary)?;
        }
        Ok(())
    }

    fn record_digest(&mut self, digest: &str) -> OutputResult<()> {
        for sink in &mut self.sinks {
            sink.record_digest(digest)?;
        }
        Ok(())
    }

    fn finalize(&mut self, report: &CrawlReport) -> OutputResult<()> {
        for sink in &mut self.sinks {
            sink.finalize(report)?;
        }
        Ok(())
    }
}

/// Prints each article as one JSON line on stdout
#[derive(Debug, Default)]
pub struct JsonLinesSink;

impl RecordSink for JsonLinesSink {
    fn record_article(
        &mut self,
        article: &ArticleRecord,
        summary: Option<&str>,
    ) -> OutputResult<()> {
        let mut value = serde_json::to_value(article)?;
        if let (Some(summary), Some(object)) = (summary, value.as_object_mut()) {
            object.insert("summary".to_string(), summary.into());
        }
        println!("{}", serde_json::to_string(&value)?);
        Ok(())
    }

    fn record_digest(&mut self, digest: &str) -> OutputResult<()> {
        println!("{}", serde_json::json!({ "digest": digest }));
        Ok(())
    }

    fn finalize(&mut self, _report: &CrawlReport) -> OutputResult<()> {
        Ok(())
    }
}
