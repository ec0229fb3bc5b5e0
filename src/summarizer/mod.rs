//! Summarization of extracted article text
//!
//! This module handles the boundary to hosted chat-completion models:
//! - The `Summarizer` trait, one system prompt plus one text in, one reply out
//! - An OpenAI-compatible chat-completions client (Groq, Together, Mistral, ...)
//! - Character chunking for models with an input-size limit
//! - The chunk-then-combine driver that turns failures into readable text

mod chat;
mod chunker;

pub use chat::ChatCompletionsClient;
pub use chunker::{chunk_text, summarize, ChunkPolicy, Summary};

use crate::config::{SummarizerConfig, SummaryMode};
use crate::ConfigError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from a single summarization call
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model API returned no content")]
    EmptyResponse,
}

/// A hosted model that answers one system prompt and one text
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn complete(&self, system_prompt: &str, text: &str) -> Result<String, SummarizeError>;
}

/// Summarizer plus the prompts and chunking used for one crawl
pub struct SummaryPipeline {
    summarizer: Box<dyn Summarizer>,
    mode: SummaryMode,
    system_prompt: String,
    combine_prompt: String,
    policy: ChunkPolicy,
}

impl SummaryPipeline {
    pub fn new(
        summarizer: Box<dyn Summarizer>,
        mode: SummaryMode,
        system_prompt: &str,
        combine_prompt: &str,
        policy: ChunkPolicy,
    ) -> Self {
        Self {
            summarizer,
            mode,
            system_prompt: system_prompt.to_string(),
            combine_prompt: combine_prompt.to_string(),
            policy,
        }
    }

    /// Builds the pipeline described by the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - Summaries are turned off
    /// * `Ok(Some(SummaryPipeline))` - A chat-completions pipeline
    /// * `Err(ConfigError)` - The API key variable is unset or the client failed to build
    pub fn from_config(config: &SummarizerConfig) -> Result<Option<Self>, ConfigError> {
        if config.mode == SummaryMode::Off {
            return Ok(None);
        }

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(config.api_key_env.clone()))?;

        let client = ChatCompletionsClient::new(config, api_key).map_err(|e| {
            ConfigError::Validation(format!("Failed to build summarizer client: {}", e))
        })?;

        Ok(Some(Self::new(
            Box::new(client),
            config.mode,
            &config.system_prompt,
            &config.combine_prompt,
            ChunkPolicy::from_config(config),
        )))
    }

    pub fn mode(&self) -> SummaryMode {
        self.mode
    }

    /// Summarizes `text`, chunking it when it exceeds the chunk size
    pub async fn summarize(&self, text: &str) -> Summary {
        summarize(
            self.summarizer.as_ref(),
            text,
            &self.system_prompt,
            &self.combine_prompt,
            &self.policy,
        )
        .await
    }
}
