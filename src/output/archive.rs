//! SQLite article archive
//!
//! Stores every extracted article, the bulk digest and one row per run.
//! An article seen again on the same listing page (same sequence number and
//! same content) is ignored, so re-crawling after `--fresh` or a crash
//! does not duplicate rows.

use crate::crawler::ArticleRecord;
use crate::output::schema::initialize_schema;
use crate::output::stats::CrawlReport;
use crate::output::traits::{OutputError, OutputResult, RecordSink};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// A row of the `runs` table
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub start_cursor: u64,
    pub resume_cursor: Option<u64>,
    pub termination: Option<String>,
    pub pages_fetched: u64,
    pub articles: u64,
}

/// A row of the `articles` table
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArticle {
    pub run_id: i64,
    pub record: ArticleRecord,
    pub summary: Option<String>,
}

/// SQLite-backed output sink
pub struct SqliteArchive {
    conn: Connection,
    run_id: Option<i64>,
    inserted: u64,
    duplicates: u64,
}

impl SqliteArchive {
    /// Opens (or creates) an archive file
    pub fn open(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Opens an archive that lives only as long as the value
    pub fn open_in_memory() -> OutputResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> OutputResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            run_id: None,
            inserted: 0,
            duplicates: 0,
        })
    }

    /// Inserts a run row; later records are attached to it
    pub fn begin_run(&mut self, config_hash: &str, start_cursor: u64) -> OutputResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, start_cursor) VALUES (?1, ?2, ?3)",
            params![Utc::now().to_rfc3339(), config_hash, sql_int("start_cursor", start_cursor)?],
        )?;
        let id = self.conn.last_insert_rowid();
        self.run_id = Some(id);
        self.inserted = 0;
        self.duplicates = 0;
        tracing::debug!("Started archive run {}", id);
        Ok(id)
    }

    pub fn run_id(&self) -> Option<i64> {
        self.run_id
    }

    /// Articles inserted and ignored as duplicates during the current run
    pub fn insert_counts(&self) -> (u64, u64) {
        (self.inserted, self.duplicates)
    }

    fn active_run(&self) -> OutputResult<i64> {
        self.run_id.ok_or(OutputError::NoActiveRun)
    }

    pub fn count_runs(&self) -> OutputResult<u64> {
        self.count("SELECT COUNT(*) FROM runs")
    }

    pub fn count_articles(&self) -> OutputResult<u64> {
        self.count("SELECT COUNT(*) FROM articles")
    }

    pub fn count_distinct_pages(&self) -> OutputResult<u64> {
        self.count("SELECT COUNT(DISTINCT sequence) FROM articles")
    }

    pub fn count_digests(&self) -> OutputResult<u64> {
        self.count("SELECT COUNT(*) FROM digests")
    }

    fn count(&self, sql: &str) -> OutputResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Finished runs grouped by termination reason
    pub fn runs_by_termination(&self) -> OutputResult<BTreeMap<String, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(termination, 'interrupted'), COUNT(*) FROM runs GROUP BY 1",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (termination, count) = row?;
            counts.insert(termination, count as u64);
        }
        Ok(counts)
    }

    pub fn latest_run(&self) -> OutputResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, start_cursor, resume_cursor,
                        termination, pages_fetched, articles
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        start_cursor: row.get::<_, i64>(4)? as u64,
                        resume_cursor: row.get::<_, Option<i64>>(5)?.map(|c| c as u64),
                        termination: row.get(6)?,
                        pages_fetched: row.get::<_, i64>(7)? as u64,
                        articles: row.get::<_, i64>(8)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(run)
    }

    /// Articles in insertion order, optionally limited to one run
    pub fn articles(&self, run_id: Option<i64>) -> OutputResult<Vec<StoredArticle>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, sequence, source_url, title, publish_time, content, summary
             FROM articles WHERE ?1 IS NULL OR run_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([run_id], |row| {
            Ok(StoredArticle {
                run_id: row.get(0)?,
                record: ArticleRecord {
                    sequence: row.get::<_, i64>(1)? as u64,
                    source_url: row.get(2)?,
                    title: row.get(3)?,
                    publish_time: row.get(4)?,
                    content: row.get(5)?,
                },
                summary: row.get(6)?,
            })
        })?;

        let mut articles = Vec::new();
        for row in rows {
            articles.push(row?);
        }
        Ok(articles)
    }

    pub fn digests(&self, run_id: i64) -> OutputResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT text FROM digests WHERE run_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map([run_id], |row| row.get::<_, String>(0))?;

        let mut digests = Vec::new();
        for row in rows {
            digests.push(row?);
        }
        Ok(digests)
    }
}

/// Identifies an article's content independent of where it was archived
pub fn content_hash(article: &ArticleRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(article.title.as_bytes());
    hasher.update([0]);
    hasher.update(article.publish_time.as_deref().unwrap_or("").as_bytes());
    hasher.update([0]);
    hasher.update(article.content.as_bytes());
    hex::encode(hasher.finalize())
}

/// SQLite integers are signed; larger values are rejected rather than wrapped
fn sql_int(field: &'static str, value: u64) -> OutputResult<i64> {
    i64::try_from(value).map_err(|_| OutputError::OutOfRange { field, value })
}

impl RecordSink for SqliteArchive {
    fn record_article(
        &mut self,
        article: &ArticleRecord,
        summary: Option<&str>,
    ) -> OutputResult<()> {
        let run_id = self.active_run()?;
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO articles
                (run_id, sequence, source_url, title, publish_time, content, content_hash,
                 summary, extracted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id,
                sql_int("sequence", article.sequence)?,
                article.source_url,
                article.title,
                article.publish_time,
                article.content,
                content_hash(article),
                summary,
                Utc::now().to_rfc3339(),
            ],
        )?;

        if changed == 0 {
            self.duplicates += 1;
            tracing::debug!(
                "Article '{}' from page {} already archived",
                article.title,
                article.sequence
            );
        } else {
            self.inserted += 1;
        }
        Ok(())
    }

    fn record_digest(&mut self, digest: &str) -> OutputResult<()> {
        let run_id = self.active_run()?;
        self.conn.execute(
            "INSERT INTO digests (run_id, created_at, text) VALUES (?1, ?2, ?3)",
            params![run_id, Utc::now().to_rfc3339(), digest],
        )?;
        Ok(())
    }

    fn finalize(&mut self, report: &CrawlReport) -> OutputResult<()> {
        let run_id = self.active_run()?;
        let finished_at = report.finished_at.unwrap_or_else(Utc::now);
        self.conn.execute(
            "UPDATE runs SET finished_at = ?1, resume_cursor = ?2, termination = ?3,
                             pages_fetched = ?4, articles = ?5
             WHERE id = ?6",
            params![
                finished_at.to_rfc3339(),
                sql_int("resume_cursor", report.resume_cursor)?,
                report.termination.map(|t| t.as_str()),
                sql_int("pages_fetched", report.pages_fetched())?,
                sql_int("articles", self.inserted)?,
                run_id,
            ],
        )?;

        tracing::info!(
            "Archived {} new articles ({} already present) in run {}",
            self.inserted,
            self.duplicates,
            run_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TerminationReason;

    fn article(sequence: u64, title: &str, content: &str) -> ArticleRecord {
        ArticleRecord {
            sequence,
            source_url: format!("https://news.example.com/list/{}", sequence),
            title: title.to_string(),
            publish_time: Some("2024-05-01 10:00".to_string()),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_record_without_run_fails() {
        let mut archive = SqliteArchive::open_in_memory().unwrap();
        let result = archive.record_article(&article(1, "a", "b"), None);
        assert!(matches!(result, Err(OutputError::NoActiveRun)));
    }

    #[test]
    fn test_articles_round_trip_with_summary() {
        let mut archive = SqliteArchive::open_in_memory().unwrap();
        let run_id = archive.begin_run("abc", 1).unwrap();

        archive
            .record_article(&article(1, "First", "Body one"), Some("short"))
            .unwrap();
        archive
            .record_article(&article(1, "Second", "Body two"), None)
            .unwrap();

        let stored = archive.articles(Some(run_id)).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].record.title, "First");
        assert_eq!(stored[0].summary.as_deref(), Some("short"));
        assert_eq!(stored[1].summary, None);
        assert_eq!(archive.count_distinct_pages().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_articles_ignored() {
        let mut archive = SqliteArchive::open_in_memory().unwrap();
        archive.begin_run("abc", 1).unwrap();
        archive.record_article(&article(3, "Same", "Body"), None).unwrap();

        archive.begin_run("abc", 3).unwrap();
        archive.record_article(&article(3, "Same", "Body"), None).unwrap();
        archive.record_article(&article(4, "Same", "Body"), None).unwrap();

        assert_eq!(archive.count_articles().unwrap(), 2);
        assert_eq!(archive.insert_counts(), (1, 1));
    }

    #[test]
    fn test_placeholder_titles_with_different_bodies_kept() {
        let mut archive = SqliteArchive::open_in_memory().unwrap();
        archive.begin_run("abc", 1).unwrap();
        archive.record_article(&article(1, "no title", "one"), None).unwrap();
        archive.record_article(&article(1, "no title", "two"), None).unwrap();

        assert_eq!(archive.count_articles().unwrap(), 2);
    }

    #[test]
    fn test_finalize_updates_run() {
        let mut archive = SqliteArchive::open_in_memory().unwrap();
        archive.begin_run("abc", 5).unwrap();
        archive.record_article(&article(5, "a", "b"), None).unwrap();
        archive.record_digest("everything").unwrap();

        let mut report = CrawlReport::begin(5);
        report.record_productive_page(1, 0);
        report.finish(TerminationReason::MaxEmptyRetriesExceeded, 6);
        archive.finalize(&report).unwrap();

        let run = archive.latest_run().unwrap().unwrap();
        assert_eq!(run.start_cursor, 5);
        assert_eq!(run.resume_cursor, Some(6));
        assert_eq!(run.termination.as_deref(), Some("max_empty_retries_exceeded"));
        assert_eq!(run.pages_fetched, 1);
        assert_eq!(run.articles, 1);
        assert!(run.finished_at.is_some());
        assert_eq!(archive.digests(run.id).unwrap(), vec!["everything".to_string()]);
    }

    #[test]
    fn test_values_beyond_sqlite_range_are_rejected() {
        let mut archive = SqliteArchive::open_in_memory().unwrap();
        assert!(matches!(
            archive.begin_run("abc", u64::MAX),
            Err(OutputError::OutOfRange {
                field: "start_cursor",
                ..
            })
        ));

        archive.begin_run("abc", 1).unwrap();
        let result = archive.record_article(&article(u64::MAX, "a", "b"), None);
        assert!(matches!(
            result,
            Err(OutputError::OutOfRange {
                field: "sequence",
                value: u64::MAX
            })
        ));
        assert_eq!(archive.count_articles().unwrap(), 0);

        let mut report = CrawlReport::begin(1);
        report.finish(TerminationReason::SequenceExhausted, u64::MAX);
        assert!(matches!(
            archive.finalize(&report),
            Err(OutputError::OutOfRange {
                field: "resume_cursor",
                ..
            })
        ));
    }

    #[test]
    fn test_unfinished_runs_counted_as_interrupted() {
        let mut archive = SqliteArchive::open_in_memory().unwrap();
        archive.begin_run("abc", 1).unwrap();

        let counts = archive.runs_by_termination().unwrap();
        assert_eq!(counts.get("interrupted"), Some(&1));
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("articles.db");

        let archive = SqliteArchive::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(archive.count_runs().unwrap(), 0);
    }
}
