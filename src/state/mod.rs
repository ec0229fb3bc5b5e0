//! State module for the crawl loop
//!
//! The crawl is an explicit state machine driven by a pure transition
//! function, so every retry and checkpoint decision can be tested without
//! a network.
//!
//! # Components
//!
//! - `CrawlState`: `Running`, `Backoff` (inside an empty-page streak) or `Terminated`
//! - `PageOutcome`: what processing one page produced
//! - `transition`: computes the next state, the cursor to persist and the pause to take

mod crawl_state;

// Re-export main types
pub use crawl_state::{
    stop, transition, CrawlState, EmptyReason, PageOutcome, Pause, Step, TerminationReason,
    MAX_SEQUENCE,
};
