//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Loading the resume cursor
//! - Fetching, parsing and extracting one numbered page per iteration
//! - Applying the empty-streak retry policy and persisting the cursor
//! - Handling cancellation and run limits
//! - Feeding records to output sinks and the summarizer

use crate::config::{Config, CrawlerConfig, SummaryMode};
use crate::crawler::extractor::{extract_all, ArticleRecord, PageExtraction};
use crate::crawler::fetcher::{FetchResult, HttpFetcher, PageFetcher};
use crate::crawler::parser::{parse_page, ArticleSelectors};
use crate::output::{CrawlReport, RecordSink};
use crate::state::{
    stop, transition, CrawlState, EmptyReason, PageOutcome, Pause, Step, TerminationReason,
};
use crate::storage::{load_position, CursorStore, FileCursorStore, StorageError};
use crate::summarizer::SummaryPipeline;
use crate::SweepError;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Retry, pacing and run-length limits of the crawl loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlLimits {
    /// Consecutive empty pages that end the crawl
    pub max_empty_retries: u32,

    /// Pause after every productive page
    pub inter_request_delay: Duration,

    /// Pause after the first empty page of a streak, doubled for each further one
    pub empty_page_delay: Duration,

    /// Upper bound for the empty-page pause
    pub max_empty_page_delay: Duration,

    /// Stop after this many fetched pages
    pub max_pages: Option<u64>,

    /// Stop after this much time
    pub max_run_duration: Option<Duration>,
}

impl CrawlLimits {
    /// Limits without any pauses or run bounds
    pub fn new(max_empty_retries: u32) -> Self {
        Self {
            max_empty_retries,
            inter_request_delay: Duration::ZERO,
            empty_page_delay: Duration::ZERO,
            max_empty_page_delay: Duration::ZERO,
            max_pages: None,
            max_run_duration: None,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_empty_retries: config.max_empty_retries,
            inter_request_delay: Duration::from_millis(config.inter_request_delay_ms),
            empty_page_delay: Duration::from_millis(config.empty_page_delay_ms),
            max_empty_page_delay: Duration::from_millis(config.max_empty_page_delay_ms),
            max_pages: config.max_pages,
            max_run_duration: config.max_run_seconds.map(Duration::from_secs),
        }
    }

    /// Length of a pause requested by the state machine
    pub fn pause_duration(&self, pause: Pause) -> Duration {
        match pause {
            Pause::None => Duration::ZERO,
            Pause::InterRequest => self.inter_request_delay,
            Pause::EmptyPage(streak) => {
                let factor = 2u32.saturating_pow(streak.saturating_sub(1));
                self.empty_page_delay
                    .saturating_mul(factor)
                    .min(self.max_empty_page_delay)
            }
        }
    }
}

/// What one iteration of the crawl loop produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// The page yielded at least one record
    Articles {
        sequence: u64,
        records: Vec<ArticleRecord>,
        /// Containers rejected by the extractor
        skipped: usize,
    },

    /// The page yielded nothing
    Empty { sequence: u64, reason: EmptyReason },

    /// The crawl is over; every further call returns this event again
    Stopped {
        reason: TerminationReason,
        /// Persisted position the next run starts from
        resume_cursor: u64,
    },
}

/// Main crawler coordinator structure
///
/// The coordinator owns the fetcher and the cursor store. Everything else a
/// crawl needs between iterations (state, cursor, counters) lives here, and
/// the only thing that outlives it is what was written to the cursor store.
pub struct Coordinator<F = HttpFetcher, S = FileCursorStore> {
    fetcher: F,
    store: S,
    selectors: ArticleSelectors,
    limits: CrawlLimits,
    cancel: CancellationToken,
    state: CrawlState,
    cursor: u64,
    start_cursor: u64,
    resume_cursor: u64,
    pages_fetched: u64,
    started: Option<Instant>,
    pending_pause: Duration,
}

impl Coordinator<HttpFetcher, FileCursorStore> {
    /// Creates a coordinator that fetches over HTTP and checkpoints to the cursor file
    pub fn from_config(config: &Config) -> Result<Self, SweepError> {
        let fetcher = HttpFetcher::new(&config.crawler, &config.user_agent)?;
        let store = FileCursorStore::new(Path::new(&config.cursor.path));
        let selectors = ArticleSelectors::compile(&config.selectors)?;
        let limits = CrawlLimits::from_config(&config.crawler);
        Ok(Self::new(fetcher, store, selectors, limits)?)
    }
}

impl<F: PageFetcher, S: CursorStore> Coordinator<F, S> {
    /// Creates a new coordinator instance, resuming from the stored cursor
    ///
    /// A missing or unreadable cursor starts the crawl at 0 with a warning.
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to crawl
    /// * `Err(StorageError)` - The cursor location could not be read
    pub fn new(
        fetcher: F,
        store: S,
        selectors: ArticleSelectors,
        limits: CrawlLimits,
    ) -> Result<Self, StorageError> {
        let cursor = load_position(&store)?;
        tracing::info!("Resuming from page {} ({})", cursor, store.location());

        Ok(Self {
            fetcher,
            store,
            selectors,
            limits,
            cancel: CancellationToken::new(),
            state: CrawlState::Running,
            cursor,
            start_cursor: cursor,
            resume_cursor: cursor,
            pages_fetched: 0,
            started: None,
            pending_pause: Duration::ZERO,
        })
    }

    /// Uses `token` to stop the crawl from outside
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops this crawl when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Sequence number of the next page to fetch
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn start_cursor(&self) -> u64 {
        self.start_cursor
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Runs exactly one iteration of the crawl loop
    ///
    /// 1. Stop if cancelled or a run limit is reached
    /// 2. Take the pause requested by the previous iteration, then check the
    ///    stop conditions again
    /// 3. Fetch, parse and extract the page at the cursor
    /// 4. Apply the state transition and persist the cursor it asks for
    ///
    /// Records are produced lazily: nothing is fetched until this is called.
    pub async fn next_page(&mut self) -> Result<PageEvent, StorageError> {
        if let CrawlState::Terminated(reason) = self.state {
            return Ok(PageEvent::Stopped {
                reason,
                resume_cursor: self.resume_cursor,
            });
        }

        let started = *self.started.get_or_insert_with(Instant::now);

        if let Some(reason) = self.stop_condition(started) {
            return self.finish(reason);
        }

        let pause = std::mem::take(&mut self.pending_pause);
        if !self.pause(pause).await {
            return self.finish(TerminationReason::Cancelled);
        }
        if let Some(reason) = self.stop_condition(started) {
            return self.finish(reason);
        }

        let sequence = self.cursor;
        let source_url = self.fetcher.page_url(sequence);
        let fetched = self.fetcher.fetch(sequence).await;
        self.pages_fetched += 1;

        let processed = match fetched {
            FetchResult::Success { body, .. } => self.process_body(sequence, &source_url, &body),
            FetchResult::TransientFailure { reason } => Err(EmptyReason::Transient(reason)),
            FetchResult::HttpError { status_code } => Err(EmptyReason::HttpStatus(status_code)),
        };

        let (outcome, event) = match processed {
            Ok(extraction) => {
                tracing::info!("Page {}: {} articles", sequence, extraction.records.len());
                (
                    PageOutcome::Productive {
                        records: extraction.records.len(),
                    },
                    PageEvent::Articles {
                        sequence,
                        records: extraction.records,
                        skipped: extraction.skipped,
                    },
                )
            }
            Err(reason) => {
                if reason == EmptyReason::NoContainers {
                    tracing::debug!("Page {} ({}): {}", sequence, source_url, reason);
                } else {
                    tracing::warn!("Page {} ({}): {}", sequence, source_url, reason);
                }
                (
                    PageOutcome::Empty(reason.clone()),
                    PageEvent::Empty { sequence, reason },
                )
            }
        };

        let step = transition(
            &self.state,
            sequence,
            &outcome,
            self.limits.max_empty_retries,
        );
        self.apply(step)?;

        if let CrawlState::Terminated(reason) = self.state {
            tracing::info!(
                "Crawl stopped after page {}: {}, next run starts at {}",
                sequence,
                reason,
                self.resume_cursor
            );
        } else if let CrawlState::Backoff { empty_streak, .. } = self.state {
            tracing::debug!(
                "Empty streak {}/{}",
                empty_streak,
                self.limits.max_empty_retries
            );
        }

        Ok(event)
    }

    /// Drives the crawl until it stops
    ///
    /// Records go to `sink` as soon as their page is processed. With a
    /// summary pipeline in per-article mode each record is summarized first;
    /// in bulk mode all article text of the run is summarized once at the end.
    /// Summarization failures end up as text in the output, never as errors.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl stopped (for any termination reason)
    /// * `Err(SweepError)` - The cursor or an output could not be written
    pub async fn run(
        &mut self,
        sink: &mut dyn RecordSink,
        summaries: Option<&SummaryPipeline>,
    ) -> Result<CrawlReport, SweepError> {
        let mode = summaries.map_or(SummaryMode::Off, |pipeline| pipeline.mode());
        let mut report = CrawlReport::begin(self.cursor);
        let mut accumulated = String::new();

        tracing::info!(
            "Starting crawl at page {} (summaries: {})",
            self.cursor,
            mode.as_str()
        );

        loop {
            match self.next_page().await? {
                PageEvent::Articles {
                    records, skipped, ..
                } => {
                    report.record_productive_page(records.len(), skipped);

                    for record in &records {
                        let summary = match summaries {
                            Some(pipeline)
                                if mode == SummaryMode::PerArticle && record.has_content() =>
                            {
                                let summary = pipeline.summarize(&record.content).await;
                                report.record_summary(&summary);
                                Some(summary.text)
                            }
                            _ => None,
                        };

                        if mode == SummaryMode::Bulk && record.has_content() {
                            accumulated.push_str(&record.title);
                            accumulated.push('\n');
                            accumulated.push_str(&record.content);
                            accumulated.push_str("\n\n");
                        }

                        sink.record_article(record, summary.as_deref())?;
                    }
                }
                PageEvent::Empty { reason, .. } => report.record_empty_page(&reason),
                PageEvent::Stopped {
                    reason,
                    resume_cursor,
                } => {
                    report.finish(reason, resume_cursor);
                    break;
                }
            }
        }

        if let Some(pipeline) = summaries {
            if mode == SummaryMode::Bulk && !accumulated.is_empty() {
                tracing::info!(
                    "Summarizing {} characters of article text",
                    accumulated.chars().count()
                );
                let digest = pipeline.summarize(accumulated.trim_end()).await;
                report.record_summary(&digest);
                sink.record_digest(&digest.text)?;
            }
        }

        sink.finalize(&report)?;

        tracing::info!(
            "Crawl finished: {} pages, {} articles, stopped ({}) with cursor at {}",
            report.pages_fetched(),
            report.records,
            report
                .termination
                .map_or("unknown".to_string(), |r| r.to_string()),
            report.resume_cursor
        );

        Ok(report)
    }

    /// Parses a fetched body and extracts its records
    ///
    /// Synchronous so the parsed document never lives across an await point.
    fn process_body(
        &self,
        sequence: u64,
        source_url: &str,
        body: &str,
    ) -> Result<PageExtraction, EmptyReason> {
        let page = parse_page(body).map_err(|e| EmptyReason::ParseFailure(e.to_string()))?;

        let extraction = extract_all(&page, &self.selectors, sequence, source_url);
        if extraction.records.is_empty() {
            return Err(if extraction.skipped == 0 {
                EmptyReason::NoContainers
            } else {
                EmptyReason::NoRecords {
                    skipped: extraction.skipped,
                }
            });
        }

        Ok(extraction)
    }

    /// Checked at the top of every iteration
    fn stop_condition(&self, started: Instant) -> Option<TerminationReason> {
        if self.cancel.is_cancelled() {
            return Some(TerminationReason::Cancelled);
        }
        if self
            .limits
            .max_pages
            .is_some_and(|max| self.pages_fetched >= max)
        {
            return Some(TerminationReason::MaxPagesReached);
        }
        if self
            .limits
            .max_run_duration
            .is_some_and(|max| started.elapsed() >= max)
        {
            return Some(TerminationReason::DeadlineReached);
        }
        None
    }

    /// Sleeps unless cancelled; returns false when the crawl was cancelled
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancel.cancelled() => false,
        }
    }

    fn finish(&mut self, reason: TerminationReason) -> Result<PageEvent, StorageError> {
        self.apply(stop(&self.state, self.cursor, reason))?;
        tracing::info!(
            "Crawl stopped: {}, next run starts at {}",
            reason,
            self.resume_cursor
        );
        Ok(PageEvent::Stopped {
            reason,
            resume_cursor: self.resume_cursor,
        })
    }

    fn apply(&mut self, step: Step) -> Result<(), StorageError> {
        if let Some(position) = step.persist {
            self.store.save(position)?;
            self.resume_cursor = position;
        }
        self.state = step.next;
        self.cursor = step.next_cursor;
        self.pending_pause = self.limits.pause_duration(step.pause);
        Ok(())
    }
}

/// Runs a complete crawl from configuration
///
/// This is the main entry point used by the CLI. It will:
/// 1. Build the HTTP fetcher and open the cursor file
/// 2. Crawl until the empty-streak bound, a run limit or cancellation
/// 3. Summarize according to the configured mode
/// 4. Finalize every output sink
///
/// # Example
///
/// ```no_run
/// use news_sweep::config::load_config;
/// use news_sweep::crawler::run_crawl;
/// use news_sweep::output::MemorySink;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let mut sink = MemorySink::default();
/// let report = run_crawl(&config, &mut sink, None, CancellationToken::new()).await?;
/// println!("{} articles", report.records);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    sink: &mut dyn RecordSink,
    summaries: Option<&SummaryPipeline>,
    cancel: CancellationToken,
) -> Result<CrawlReport, SweepError> {
    let mut coordinator = Coordinator::from_config(config)?.with_cancellation(cancel);
    coordinator.run(sink, summaries).await
}
