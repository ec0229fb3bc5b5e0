//! Markdown digest generation
//!
//! This module collects the articles of a run and writes them, with their
//! summaries and the run statistics, to a human-readable markdown file.

use crate::crawler::ArticleRecord;
use crate::output::stats::CrawlReport;
use crate::output::traits::{OutputResult, RecordSink};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Output sink that writes a markdown digest when the run finishes
pub struct MarkdownDigest {
    path: PathBuf,
    articles: Vec<(ArticleRecord, Option<String>)>,
    digests: Vec<String>,
}

impl MarkdownDigest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            articles: Vec::new(),
            digests: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for MarkdownDigest {
    fn record_article(
        &mut self,
        article: &ArticleRecord,
        summary: Option<&str>,
    ) -> OutputResult<()> {
        self.articles
            .push((article.clone(), summary.map(str::to_string)));
        Ok(())
    }

    fn record_digest(&mut self, digest: &str) -> OutputResult<()> {
        self.digests.push(digest.to_string());
        Ok(())
    }

    fn finalize(&mut self, report: &CrawlReport) -> OutputResult<()> {
        let markdown = format_markdown_digest(report, &self.articles, &self.digests);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = File::create(&self.path)?;
        file.write_all(markdown.as_bytes())?;

        tracing::info!("Wrote digest to {}", self.path.display());
        Ok(())
    }
}

/// Formats a run as markdown
///
/// # Arguments
///
/// * `report` - Statistics of the run
/// * `articles` - Articles in crawl order with their summaries
/// * `digests` - Bulk summaries of the run
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_digest(
    report: &CrawlReport,
    articles: &[(ArticleRecord, Option<String>)],
    digests: &[String],
) -> String {
    let mut md = String::new();

    md.push_str("# News Digest\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Started**: {}\n",
        report.started_at.to_rfc3339()
    ));
    if let Some(finished) = report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration_seconds() {
        md.push_str(&format!("- **Duration**: {} seconds\n", duration));
    }
    if let Some(reason) = report.termination {
        md.push_str(&format!("- **Stopped**: {}\n", reason));
    }
    md.push_str(&format!(
        "- **Pages**: {} to {}\n",
        report.start_cursor, report.resume_cursor
    ));
    md.push_str(&format!(
        "- **Pages Fetched**: {} ({} productive)\n",
        report.pages_fetched(),
        report.productive_pages
    ));
    md.push_str(&format!("- **Articles**: {}\n\n", report.records));

    if !report.empty_pages.is_empty() {
        md.push_str("| Empty Page Kind | Count |\n");
        md.push_str("|-----------------|-------|\n");
        for (kind, count) in &report.empty_pages {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    if !digests.is_empty() {
        md.push_str("## Summary\n\n");
        for digest in digests {
            md.push_str(digest.trim());
            md.push_str("\n\n");
        }
    }

    if !articles.is_empty() {
        md.push_str("## Articles\n\n");
        for (article, summary) in articles {
            md.push_str(&format!("### {}\n\n", article.title));

            let mut meta = vec![format!("page {}", article.sequence)];
            if let Some(time) = &article.publish_time {
                meta.insert(0, time.clone());
            }
            md.push_str(&format!(
                "*{}* | [source]({})\n\n",
                meta.join(", "),
                article.source_url
            ));

            match summary {
                Some(summary) => {
                    md.push_str(&format!("> {}\n\n", summary.trim().replace('\n', "\n> ")));
                }
                None => {
                    md.push_str(article.content.trim());
                    md.push_str("\n\n");
                }
            }
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{EmptyReason, TerminationReason};

    fn create_test_report() -> CrawlReport {
        let mut report = CrawlReport::begin(7);
        report.record_productive_page(2, 0);
        report.record_empty_page(&EmptyReason::NoContainers);
        report.finish(TerminationReason::MaxEmptyRetriesExceeded, 8);
        report
    }

    fn article(title: &str, time: Option<&str>) -> ArticleRecord {
        ArticleRecord {
            sequence: 7,
            source_url: "https://news.example.com/list/7".to_string(),
            title: title.to_string(),
            publish_time: time.map(str::to_string),
            content: format!("{} body", title),
        }
    }

    #[test]
    fn test_format_contains_run_information() {
        let markdown = format_markdown_digest(&create_test_report(), &[], &[]);

        assert!(markdown.contains("# News Digest"));
        assert!(markdown.contains("- **Stopped**: no more articles found"));
        assert!(markdown.contains("- **Pages**: 7 to 8"));
        assert!(markdown.contains("| no_containers | 1 |"));
        assert!(!markdown.contains("## Articles"));
    }

    #[test]
    fn test_summary_replaces_body() {
        let articles = vec![
            (article("Rates rise", Some("09:30")), Some("Rates went up.".to_string())),
            (article("Storm", None), None),
        ];
        let markdown = format_markdown_digest(&create_test_report(), &articles, &[]);

        assert!(markdown.contains("### Rates rise"));
        assert!(markdown.contains("*09:30, page 7*"));
        assert!(markdown.contains("> Rates went up."));
        assert!(!markdown.contains("Rates rise body"));
        assert!(markdown.contains("Storm body"));
    }

    #[test]
    fn test_bulk_digest_section() {
        let markdown = format_markdown_digest(
            &create_test_report(),
            &[],
            &["Everything that happened.".to_string()],
        );

        assert!(markdown.contains("## Summary\n\nEverything that happened."));
    }

    #[test]
    fn test_finalize_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("digest.md");
        let mut sink = MarkdownDigest::new(&path);

        sink.record_article(&article("Storm", None), None).unwrap();
        sink.finalize(&create_test_report()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("### Storm"));
    }
}
