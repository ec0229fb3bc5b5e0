use crate::config::types::{
    Config, CrawlerConfig, CursorConfig, OutputConfig, SelectorConfig, SummarizerConfig,
    SummaryMode, UserAgentConfig,
};
use crate::crawler::{build_page_url, ArticleSelectors};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_selector_config(&config.selectors)?;
    validate_cursor_config(&config.cursor)?;
    validate_summarizer_config(&config.summarizer)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl loop configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let template = &config.base_url_template;
    Url::parse(template).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid base-url-template '{}': {}", template, e))
    })?;

    let substituted = build_page_url(template, 0).ok_or_else(|| {
        ConfigError::Validation(format!(
            "base-url-template '{}' needs a run of digits in its path or query",
            template
        ))
    })?;
    let url = Url::parse(&substituted).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid page URL '{}': {}", substituted, e))
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url-template must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.max_empty_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_empty_retries must be >= 1, got {}",
            config.max_empty_retries
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_empty_page_delay_ms < config.empty_page_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max_empty_page_delay_ms ({}) must be >= empty_page_delay_ms ({})",
            config.max_empty_page_delay_ms, config.empty_page_delay_ms
        )));
    }

    if config.encoding.trim().is_empty() {
        return Err(ConfigError::Validation("encoding cannot be empty".to_string()));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    if config.max_run_seconds == Some(0) {
        return Err(ConfigError::Validation(
            "max_run_seconds must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates the request identification header
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent value cannot be empty".to_string(),
        ));
    }

    if config.value.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(
            "user-agent value cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every selector compiles
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    ArticleSelectors::compile(config).map(|_| ())
}

fn validate_cursor_config(config: &CursorConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "cursor path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates summarizer settings; the endpoint only matters when summaries are on
fn validate_summarizer_config(config: &SummarizerConfig) -> Result<(), ConfigError> {
    if config.chunk_size < 1 {
        return Err(ConfigError::Validation(format!(
            "chunk_size must be >= 1, got {}",
            config.chunk_size
        )));
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::Validation(format!(
            "temperature must be between 0.0 and 2.0, got {}",
            config.temperature
        )));
    }

    if config.mode == SummaryMode::Off {
        return Ok(());
    }

    Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid summarizer endpoint: {}", e)))?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "summarizer model cannot be empty".to_string(),
        ));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "api_key_env cannot be empty".to_string(),
        ));
    }

    if config.system_prompt.trim().is_empty() {
        return Err(ConfigError::Validation(
            "system_prompt cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.summary_path.as_deref().is_some_and(|p| p.is_empty()) {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    if config.database_path.as_deref().is_some_and(|p| p.is_empty()) {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
