//! Article record extraction
//!
//! Each article container is turned into one `ArticleRecord`. Missing
//! sub-elements are expected and fall back to placeholders. A container is
//! only rejected when `skip-empty` is enabled and nothing in it matched, and
//! that rejection never leaves this module as anything but a skipped container.

use crate::crawler::parser::{ArticleSelectors, ParsedPage};
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder title for containers without a title element
pub const NO_TITLE: &str = "no title";

/// Placeholder content for containers without a body element
pub const NO_BODY: &str = "no body";

/// One extracted article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Sequence number of the page the article was found on
    pub sequence: u64,

    /// URL of that page
    pub source_url: String,

    pub title: String,

    /// Publish time as displayed by the site
    pub publish_time: Option<String>,

    pub content: String,
}

impl ArticleRecord {
    pub fn has_title(&self) -> bool {
        self.title != NO_TITLE
    }

    pub fn has_content(&self) -> bool {
        self.content != NO_BODY
    }
}

/// Result of looking up one field inside a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLookup {
    Found(String),
    Absent,
}

impl FieldLookup {
    /// Builds a lookup from collected text, treating blank text as absent
    fn from_text(text: &str) -> Self {
        let normalized = normalize_whitespace(text);
        if normalized.is_empty() {
            Self::Absent
        } else {
            Self::Found(normalized)
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent => None,
        }
    }

    pub fn or_placeholder(self, placeholder: &str) -> String {
        self.into_option()
            .unwrap_or_else(|| placeholder.to_string())
    }
}

/// Errors that reject a single container
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("container has no title, publish time or body")]
    EmptyContainer,
}

/// Records extracted from one page
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    pub records: Vec<ArticleRecord>,

    /// Containers rejected by the extractor
    pub skipped: usize,
}

/// Looks up the text of the first element matching `selector` inside `container`
pub fn lookup_text(container: ElementRef<'_>, selector: &Selector) -> FieldLookup {
    match container.select(selector).next() {
        Some(element) => FieldLookup::from_text(&element.text().collect::<Vec<_>>().join(" ")),
        None => FieldLookup::Absent,
    }
}

/// Looks up the publish time, dropping icon elements and serialized icon markup
pub fn lookup_time(container: ElementRef<'_>, time: &Selector, icon: &Selector) -> FieldLookup {
    match container.select(time).next() {
        Some(element) => {
            let text = text_excluding(element, icon);
            FieldLookup::from_text(&strip_icon_markup(&text))
        }
        None => FieldLookup::Absent,
    }
}

/// Extracts one record from an article container
///
/// # Returns
///
/// * `Ok(ArticleRecord)` - Absent fields hold placeholders
/// * `Err(ExtractionError::EmptyContainer)` - `skip_empty` is set and nothing could be extracted
pub fn extract(
    container: ElementRef<'_>,
    selectors: &ArticleSelectors,
    sequence: u64,
    source_url: &str,
) -> Result<ArticleRecord, ExtractionError> {
    let title = lookup_text(container, &selectors.title);
    let publish_time = lookup_time(container, &selectors.time, &selectors.icon);
    let content = lookup_text(container, &selectors.body);

    if selectors.skip_empty
        && !title.is_found()
        && !publish_time.is_found()
        && !content.is_found()
    {
        return Err(ExtractionError::EmptyContainer);
    }

    Ok(ArticleRecord {
        sequence,
        source_url: source_url.to_string(),
        title: title.or_placeholder(NO_TITLE),
        publish_time: publish_time.into_option(),
        content: content.or_placeholder(NO_BODY),
    })
}

/// Extracts records from every top-level container of a page
///
/// Rejected containers are logged and counted, never propagated.
pub fn extract_all(
    page: &ParsedPage,
    selectors: &ArticleSelectors,
    sequence: u64,
    source_url: &str,
) -> PageExtraction {
    let mut extraction = PageExtraction::default();

    for (index, container) in page.containers(selectors).into_iter().enumerate() {
        match extract(container, selectors, sequence, source_url) {
            Ok(record) => extraction.records.push(record),
            Err(e) => {
                tracing::warn!(
                    "Skipping container {} on page {}: {}",
                    index,
                    sequence,
                    e
                );
                extraction.skipped += 1;
            }
        }
    }

    extraction
}

/// Collects the text below `element`, leaving out subtrees matching `exclude`
fn text_excluding(element: ElementRef<'_>, exclude: &Selector) -> String {
    let mut out = String::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_excluded = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != element.id())
            .filter_map(ElementRef::wrap)
            .any(|ancestor| exclude.matches(&ancestor));
        if !inside_excluded {
            out.push_str(text);
            out.push(' ');
        }
    }

    out
}

/// Removes serialized `<img ...>`, `<i ...></i>` and `<svg ...>...</svg>` fragments
///
/// Some sites render the clock icon next to the publish time as escaped
/// markup, which then shows up in the element's text.
pub fn strip_icon_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    loop {
        // ASCII lowercasing keeps byte offsets identical to `rest`
        let lower = rest.to_ascii_lowercase();
        let Some(start) = find_icon_start(&lower) else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..start]);

        let end = if lower[start..].starts_with("<svg") {
            lower[start..]
                .find("</svg>")
                .map(|offset| start + offset + "</svg>".len())
        } else if lower[start..].starts_with("<i") {
            lower[start..]
                .find("</i>")
                .map(|offset| start + offset + "</i>".len())
                .or_else(|| lower[start..].find('>').map(|offset| start + offset + 1))
        } else {
            lower[start..].find('>').map(|offset| start + offset + 1)
        };

        match end {
            Some(end) => rest = &rest[end..],
            // Unterminated fragment: drop the remainder
            None => break,
        }
    }

    out
}

fn find_icon_start(lower: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(offset) = lower[search_from..].find('<') {
        let start = search_from + offset;
        let tail = &lower[start..];
        let is_icon = tail.starts_with("<img")
            || tail.starts_with("<svg")
            || tail.starts_with("<i>")
            || tail.starts_with("<i ");
        if is_icon {
            return Some(start);
        }
        search_from = start + 1;
    }
    None
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
