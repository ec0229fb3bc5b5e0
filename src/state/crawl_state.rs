/// Crawl state definitions and the transition function
///
/// This module defines every state the crawl loop can be in and how one
/// processed page moves it to the next.
use std::fmt;

/// Largest page number the crawl will visit
///
/// Bounded by SQLite's signed 64-bit integers, where the archive keeps it.
pub const MAX_SEQUENCE: u64 = i64::MAX as u64;

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationReason {
    /// The configured number of consecutive empty pages was reached.
    /// This is the normal end of a crawl: the site has no more pages.
    MaxEmptyRetriesExceeded,

    /// The caller cancelled the crawl
    Cancelled,

    /// The configured page limit was reached
    MaxPagesReached,

    /// The configured run duration elapsed
    DeadlineReached,

    /// The page number cannot advance past `MAX_SEQUENCE`
    SequenceExhausted,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxEmptyRetriesExceeded => "max_empty_retries_exceeded",
            Self::Cancelled => "cancelled",
            Self::MaxPagesReached => "max_pages_reached",
            Self::DeadlineReached => "deadline_reached",
            Self::SequenceExhausted => "sequence_exhausted",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::MaxEmptyRetriesExceeded => "no more articles found",
            Self::Cancelled => "cancelled",
            Self::MaxPagesReached => "page limit reached",
            Self::DeadlineReached => "run time limit reached",
            Self::SequenceExhausted => "no page numbers left",
        };
        write!(f, "{}", message)
    }
}

/// Why a page produced no records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    /// Timeout, connection refused, DNS failure, unreadable body
    Transient(String),

    /// The response completed with a status other than 200
    HttpStatus(u16),

    /// The body could not be treated as markup
    ParseFailure(String),

    /// The page parsed but holds no article containers
    NoContainers,

    /// Containers were found but every one of them failed extraction
    NoRecords { skipped: usize },
}

impl EmptyReason {
    /// Stable key used in statistics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::HttpStatus(_) => "http_status",
            Self::ParseFailure(_) => "parse_failure",
            Self::NoContainers => "no_containers",
            Self::NoRecords { .. } => "no_records",
        }
    }

    /// True for failures of the request itself rather than of the content
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::HttpStatus(_))
    }
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(reason) => write!(f, "request failed: {}", reason),
            Self::HttpStatus(status) => write!(f, "HTTP {}", status),
            Self::ParseFailure(reason) => write!(f, "unparseable page: {}", reason),
            Self::NoContainers => write!(f, "no article containers"),
            Self::NoRecords { skipped } => {
                write!(f, "all {} containers failed extraction", skipped)
            }
        }
    }
}

/// Result of processing the page at the current cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// At least one record was extracted
    Productive { records: usize },

    /// Nothing usable came out of the page
    Empty(EmptyReason),
}

/// State of the crawl loop between two pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// The last page was productive (or nothing has been fetched yet)
    Running,

    /// Inside a streak of empty pages
    Backoff {
        /// Consecutive empty pages so far
        empty_streak: u32,
        /// Sequence number of the first page of the streak
        first_empty: u64,
    },

    /// The crawl is over
    Terminated(TerminationReason),
}

impl CrawlState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }

    pub fn empty_streak(&self) -> u32 {
        match self {
            Self::Backoff { empty_streak, .. } => *empty_streak,
            _ => 0,
        }
    }

    /// Position a later run should resume from when stopping at `cursor`
    ///
    /// Inside an empty streak this is the first empty page, so pages that were
    /// empty only because they were not published yet get fetched again.
    pub fn resume_point(&self, cursor: u64) -> u64 {
        match self {
            Self::Backoff { first_empty, .. } => *first_empty,
            _ => cursor,
        }
    }
}

/// Pause to take before the next fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    None,
    /// Politeness delay after a productive page
    InterRequest,
    /// Empty-page backoff for the given streak length
    EmptyPage(u32),
}

/// Everything the coordinator has to do after one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub next: CrawlState,
    /// Cursor value to persist, if any
    pub persist: Option<u64>,
    /// Sequence number to fetch next
    pub next_cursor: u64,
    pub pause: Pause,
}

/// Computes the step that follows processing the page at `cursor`
///
/// | Outcome | Next state | Persisted | Next cursor |
/// |---------|------------|-----------|-------------|
/// | Productive | Running | cursor + 1 | cursor + 1 |
/// | Empty, streak < max | Backoff | nothing | cursor + 1 |
/// | Empty, streak = max | Terminated | first page of the streak | unchanged |
///
/// When `cursor + 1` would exceed `MAX_SEQUENCE` the crawl terminates with
/// `SequenceExhausted` instead of advancing, persisting the cursor itself (or
/// the first page of a running empty streak). A terminated state absorbs
/// every outcome.
pub fn transition(
    state: &CrawlState,
    cursor: u64,
    outcome: &PageOutcome,
    max_empty_retries: u32,
) -> Step {
    if state.is_terminated() {
        return Step {
            next: *state,
            persist: None,
            next_cursor: cursor,
            pause: Pause::None,
        };
    }

    let Some(following) = cursor.checked_add(1).filter(|next| *next <= MAX_SEQUENCE) else {
        let resume = match outcome {
            PageOutcome::Productive { .. } => cursor,
            PageOutcome::Empty(_) => state.resume_point(cursor),
        };
        return Step {
            next: CrawlState::Terminated(TerminationReason::SequenceExhausted),
            persist: Some(resume),
            next_cursor: cursor,
            pause: Pause::None,
        };
    };

    match outcome {
        PageOutcome::Productive { .. } => Step {
            next: CrawlState::Running,
            persist: Some(following),
            next_cursor: following,
            pause: Pause::InterRequest,
        },
        PageOutcome::Empty(_) => {
            let (empty_streak, first_empty) = match state {
                CrawlState::Backoff {
                    empty_streak,
                    first_empty,
                } => (empty_streak.saturating_add(1), *first_empty),
                _ => (1, cursor),
            };

            if empty_streak >= max_empty_retries {
                Step {
                    next: CrawlState::Terminated(TerminationReason::MaxEmptyRetriesExceeded),
                    persist: Some(first_empty),
                    next_cursor: cursor,
                    pause: Pause::None,
                }
            } else {
                Step {
                    next: CrawlState::Backoff {
                        empty_streak,
                        first_empty,
                    },
                    persist: None,
                    next_cursor: following,
                    pause: Pause::EmptyPage(empty_streak),
                }
            }
        }
    }
}

/// Computes the step for a stop requested from outside the page flow
pub fn stop(state: &CrawlState, cursor: u64, reason: TerminationReason) -> Step {
    if state.is_terminated() {
        return Step {
            next: *state,
            persist: None,
            next_cursor: cursor,
            pause: Pause::None,
        };
    }

    Step {
        next: CrawlState::Terminated(reason),
        persist: Some(state.resume_point(cursor)),
        next_cursor: cursor,
        pause: Pause::None,
    }
}
