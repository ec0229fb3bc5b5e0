//! HTML parser for locating article containers
//!
//! This module handles parsing listing pages:
//! - Compiling the configured CSS selectors once per crawl
//! - Rejecting bodies that are not markup at all
//! - Finding the top-level article containers on a page

use crate::config::SelectorConfig;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// A body that cannot be treated as an HTML document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("page body is empty")]
    Blank,

    #[error("page body contains no markup")]
    NotMarkup,
}

/// Compiled selectors describing the article markup of the source site
#[derive(Debug, Clone)]
pub struct ArticleSelectors {
    pub container: Selector,
    pub title: Selector,
    pub time: Selector,
    pub body: Selector,
    pub icon: Selector,

    /// Reject containers with no field at all instead of filling placeholders
    pub skip_empty: bool,
}

impl ArticleSelectors {
    /// Compiles every selector of the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(ArticleSelectors)` - All selectors compiled
    /// * `Err(ConfigError::InvalidSelector)` - The first selector that failed
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            container: compile_selector("container", &config.container)?,
            title: compile_selector("title", &config.title)?,
            time: compile_selector("time", &config.time)?,
            body: compile_selector("body", &config.body)?,
            icon: compile_selector("icon", &config.icon)?,
            skip_empty: config.skip_empty,
        })
    }
}

fn compile_selector(field: &'static str, css: &str) -> Result<Selector, ConfigError> {
    if css.trim().is_empty() {
        return Err(ConfigError::InvalidSelector {
            field,
            message: "selector cannot be empty".to_string(),
        });
    }
    Selector::parse(css).map_err(|e| ConfigError::InvalidSelector {
        field,
        message: e.to_string(),
    })
}

/// A parsed listing page
pub struct ParsedPage {
    document: Html,
}

impl ParsedPage {
    /// Top-level article containers, in document order
    ///
    /// A container nested inside another matching container belongs to its
    /// ancestor and is not returned separately. An empty result is a valid
    /// page with no articles, not an error.
    pub fn containers<'a>(&'a self, selectors: &ArticleSelectors) -> Vec<ElementRef<'a>> {
        self.document
            .select(&selectors.container)
            .filter(|element| {
                !element
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|ancestor| selectors.container.matches(&ancestor))
            })
            .collect()
    }
}

/// Parses a page body into a document
///
/// # Example
///
/// ```
/// use news_sweep::config::SelectorConfig;
/// use news_sweep::crawler::{parse_page, ArticleSelectors};
///
/// let selectors = ArticleSelectors::compile(&SelectorConfig {
///     container: "div.item".to_string(),
///     title: "h3".to_string(),
///     time: "span.time".to_string(),
///     body: "p".to_string(),
///     icon: "img".to_string(),
///     skip_empty: false,
/// })
/// .unwrap();
///
/// let page = parse_page(r#"<div class="item"><h3>One</h3></div>"#).unwrap();
/// assert_eq!(page.containers(&selectors).len(), 1);
/// ```
pub fn parse_page(body: &str) -> Result<ParsedPage, ParseFailure> {
    if body.trim().is_empty() {
        return Err(ParseFailure::Blank);
    }
    if !body.contains('<') {
        return Err(ParseFailure::NotMarkup);
    }

    Ok(ParsedPage {
        document: Html::parse_document(body),
    })
}
