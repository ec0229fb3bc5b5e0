//! Chunked summarization
//!
//! Long text is cut into character chunks, each chunk is summarized on its
//! own, and the partial summaries are merged with exactly one more call.

use crate::config::SummarizerConfig;
use crate::summarizer::Summarizer;
use std::time::Duration;

/// How text is split before it reaches the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    /// Maximum characters per call
    pub chunk_size: usize,

    /// Pause between consecutive model calls
    pub delay: Duration,
}

impl ChunkPolicy {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &SummarizerConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            delay: Duration::from_millis(config.chunk_delay_ms),
        }
    }
}

/// Outcome of summarizing one unit of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// The summary, or a readable error message in its place
    pub text: String,

    /// Model calls made
    pub calls: usize,

    /// Calls that failed
    pub failures: usize,
}

impl Summary {
    pub fn is_degraded(&self) -> bool {
        self.failures > 0
    }
}

/// Splits `text` into chunks of at most `chunk_size` characters
///
/// Splits on character boundaries, so the result has `ceil(chars / chunk_size)`
/// elements. Empty text yields no chunks.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<&str> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (index, _) in text.char_indices() {
        if count == chunk_size {
            chunks.push(&text[start..index]);
            start = index;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}

/// Summarizes `text`, chunking and combining when it is too long
///
/// A failed chunk call contributes an error message in place of its summary;
/// a failed combine call makes the whole result an error message. Nothing
/// here returns an error, the crawl always keeps going.
pub async fn summarize(
    summarizer: &dyn Summarizer,
    text: &str,
    system_prompt: &str,
    combine_prompt: &str,
    policy: &ChunkPolicy,
) -> Summary {
    let chunks = chunk_text(text, policy.chunk_size);
    let mut summary = Summary {
        text: String::new(),
        calls: 0,
        failures: 0,
    };

    match chunks.len() {
        0 => return summary,
        1 => {
            let text = call(summarizer, system_prompt, chunks[0], &mut summary).await;
            summary.text = text;
            return summary;
        }
        _ => {}
    }

    tracing::debug!(
        "Summarizing {} chunks of up to {} characters",
        chunks.len(),
        policy.chunk_size
    );

    let mut partials = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        if index > 0 {
            pause(policy.delay).await;
        }
        partials.push(call(summarizer, system_prompt, chunk, &mut summary).await);
    }

    pause(policy.delay).await;
    let combined = partials.join("\n\n");
    let text = call(summarizer, combine_prompt, &combined, &mut summary).await;
    summary.text = text;
    summary
}

async fn call(
    summarizer: &dyn Summarizer,
    prompt: &str,
    text: &str,
    summary: &mut Summary,
) -> String {
    summary.calls += 1;
    match summarizer.complete(prompt, text).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Summarization failed: {}", e);
            summary.failures += 1;
            format!("[summarization failed: {}]", e)
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
