//! Crawler module for sequential page fetching and article extraction
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of numbered listing pages
//! - HTML parsing and article container lookup
//! - Per-container record extraction
//! - The crawl loop with retry, checkpoint and termination handling

mod coordinator;
mod extractor;
mod fetcher;
mod parser;

pub use coordinator::{run_crawl, Coordinator, CrawlLimits, PageEvent};
pub use extractor::{
    extract, extract_all, lookup_text, lookup_time, strip_icon_markup, ArticleRecord,
    ExtractionError, FieldLookup, PageExtraction, NO_BODY, NO_TITLE,
};
pub use fetcher::{build_http_client, build_page_url, FetchResult, HttpFetcher, PageFetcher};
pub use parser::{parse_page, ArticleSelectors, ParseFailure, ParsedPage};
