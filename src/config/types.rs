use serde::Deserialize;

/// Main configuration structure for News-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub selectors: SelectorConfig,
    pub cursor: CursorConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl loop behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Listing URL whose first run of digits is replaced by the sequence number
    #[serde(rename = "base-url-template")]
    pub base_url_template: String,

    /// Consecutive empty or failed pages that end the crawl
    #[serde(rename = "max-empty-retries", default = "default_max_empty_retries")]
    pub max_empty_retries: u32,

    /// Pause after every productive page (milliseconds)
    #[serde(
        rename = "inter-request-delay-ms",
        default = "default_inter_request_delay_ms"
    )]
    pub inter_request_delay_ms: u64,

    /// Base pause after an empty page, doubled for each further empty page (milliseconds)
    #[serde(rename = "empty-page-delay-ms", default)]
    pub empty_page_delay_ms: u64,

    /// Upper bound for the empty-page pause (milliseconds)
    #[serde(
        rename = "max-empty-page-delay-ms",
        default = "default_max_empty_page_delay_ms"
    )]
    pub max_empty_page_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(
        rename = "request-timeout-secs",
        default = "default_request_timeout_secs"
    )]
    pub request_timeout_secs: u64,

    /// Charset used to decode bodies when the response declares none
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Stop after this many fetched pages
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u64>,

    /// Stop after this many seconds of crawling
    #[serde(rename = "max-run-seconds", default)]
    pub max_run_seconds: Option<u64>,
}

/// Client identification sent with every page request
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(default = "default_user_agent")]
    pub value: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: default_user_agent(),
        }
    }
}

/// CSS selectors describing the article markup of the source site
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Repeating element holding one article
    pub container: String,

    /// Title element inside a container
    pub title: String,

    /// Publish time element inside a container
    pub time: String,

    /// Body element inside a container
    pub body: String,

    /// Decorative elements removed from the publish time text
    #[serde(default = "default_icon_selector")]
    pub icon: String,

    /// Drop containers where title, time and body are all missing (ad slots, spacers)
    #[serde(rename = "skip-empty", default)]
    pub skip_empty: bool,
}

/// Cursor checkpoint location
#[derive(Debug, Clone, Deserialize)]
pub struct CursorConfig {
    pub path: String,
}

/// What the crawl does with extracted article text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryMode {
    /// Records are stored without summaries
    #[default]
    Off,
    /// Each article body is summarized as soon as it is extracted
    PerArticle,
    /// All article bodies of a run are summarized once after the crawl stops
    Bulk,
}

impl SummaryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::PerArticle => "per-article",
            Self::Bulk => "bulk",
        }
    }
}

/// Hosted chat-completion settings
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub mode: SummaryMode,

    /// Base URL of an OpenAI-compatible API (Groq, Together, Mistral, ...)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(rename = "system-prompt", default = "default_system_prompt")]
    pub system_prompt: String,

    /// Instruction used to merge chunk summaries into one
    #[serde(rename = "combine-prompt", default = "default_combine_prompt")]
    pub combine_prompt: String,

    /// Maximum characters sent in one summarization call
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Pause between consecutive chunk calls (milliseconds)
    #[serde(rename = "chunk-delay-ms", default)]
    pub chunk_delay_ms: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(rename = "max-tokens", default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(
        rename = "request-timeout-secs",
        default = "default_summarizer_timeout_secs"
    )]
    pub request_timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            mode: SummaryMode::Off,
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            system_prompt: default_system_prompt(),
            combine_prompt: default_combine_prompt(),
            chunk_size: default_chunk_size(),
            chunk_delay_ms: 0,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_summarizer_timeout_secs(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Markdown digest written at the end of every run
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,

    /// SQLite archive of every extracted article
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,
}

fn default_max_empty_retries() -> u32 {
    5
}

fn default_inter_request_delay_ms() -> u64 {
    1000
}

fn default_max_empty_page_delay_ms() -> u64 {
    30_000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string()
}

fn default_icon_selector() -> String {
    "img, svg, i".to_string()
}

fn default_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_api_key_env() -> String {
    "NEWS_SWEEP_API_KEY".to_string()
}

fn default_system_prompt() -> String {
    "Summarize the following news article in a few sentences.".to_string()
}

fn default_combine_prompt() -> String {
    "Combine the following partial summaries into one coherent summary.".to_string()
}

fn default_chunk_size() -> usize {
    4000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

fn default_summarizer_timeout_secs() -> u64 {
    60
}
