//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Mapping a sequence number onto the listing URL template
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests decoded with the configured charset
//! - Error classification into transient failures and HTTP errors

use crate::config::{CrawlerConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// The page was fetched with HTTP 200
    Success {
        /// Decoded page body
        body: String,
        /// HTTP status code
        status_code: u16,
    },

    /// Network-level failure (timeout, connection refused, DNS failure, body read error)
    TransientFailure {
        /// Error description
        reason: String,
    },

    /// The response completed with a status other than 200
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Source of listing pages addressed by sequence number
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// URL of the page with the given sequence number
    fn page_url(&self, sequence: u64) -> String;

    /// Fetches the page with the given sequence number
    ///
    /// Never fails: every error is folded into the returned `FetchResult`.
    async fn fetch(&self, sequence: u64) -> FetchResult;
}

/// Substitutes `sequence` for the first run of ASCII digits in `template`
///
/// The search starts after the scheme and authority, so digits in a host name
/// or port are left alone. Returns `None` when the rest of the template
/// contains no digits.
///
/// # Example
///
/// ```
/// use news_sweep::crawler::build_page_url;
///
/// let url = build_page_url("https://news.example.com/list/1?lang=en", 250);
/// assert_eq!(url.as_deref(), Some("https://news.example.com/list/250?lang=en"));
/// ```
pub fn build_page_url(template: &str, sequence: u64) -> Option<String> {
    let path_start = template
        .find("://")
        .map(|scheme_end| scheme_end + 3)
        .map_or(0, |authority| {
            template[authority..]
                .find(['/', '?', '#'])
                .map_or(template.len(), |offset| authority + offset)
        });
    let start = path_start + template[path_start..].find(|c: char| c.is_ascii_digit())?;
    let end = template[start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(template.len(), |offset| start + offset);

    let mut url = String::with_capacity(template.len() + 20);
    url.push_str(&template[..start]);
    url.push_str(&sequence.to_string());
    url.push_str(&template[end..]);
    Some(url)
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Total request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.value.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches listing pages over HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    template: String,
    encoding: String,
}

impl HttpFetcher {
    /// Creates a fetcher from the crawler and user agent configuration
    pub fn new(
        crawler: &CrawlerConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            user_agent,
            Duration::from_secs(crawler.request_timeout_secs),
        )?;
        Ok(Self::with_client(
            client,
            &crawler.base_url_template,
            &crawler.encoding,
        ))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, template: &str, encoding: &str) -> Self {
        Self {
            client,
            template: template.to_string(),
            encoding: encoding.to_string(),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn page_url(&self, sequence: u64) -> String {
        // Validation guarantees a digit run; fall back to the raw template otherwise
        build_page_url(&self.template, sequence).unwrap_or_else(|| self.template.clone())
    }

    async fn fetch(&self, sequence: u64) -> FetchResult {
        let url = self.page_url(sequence);
        tracing::debug!("Fetching page {}: {}", sequence, url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return classify_request_error(&e),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        match response.text_with_charset(&self.encoding).await {
            Ok(body) => FetchResult::Success {
                body,
                status_code: status.as_u16(),
            },
            Err(e) => FetchResult::TransientFailure {
                reason: format!("Failed to read body: {}", e),
            },
        }
    }
}

/// Maps a request error onto a transient failure with a readable reason
fn classify_request_error(error: &reqwest::Error) -> FetchResult {
    let reason = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    };
    FetchResult::TransientFailure { reason }
}
