//! Archive schema definitions
//!
//! This module contains the SQL schema for the article archive.

/// SQL schema for the archive
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    start_cursor INTEGER NOT NULL,
    resume_cursor INTEGER,
    termination TEXT,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    articles INTEGER NOT NULL DEFAULT 0
);

-- Every extracted article, once per listing page and content
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    sequence INTEGER NOT NULL,
    source_url TEXT NOT NULL,
    title TEXT NOT NULL,
    publish_time TEXT,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    summary TEXT,
    extracted_at TEXT NOT NULL,
    UNIQUE(sequence, content_hash)
);

CREATE INDEX IF NOT EXISTS idx_articles_run ON articles(run_id);
CREATE INDEX IF NOT EXISTS idx_articles_sequence ON articles(sequence);

-- Bulk summaries
CREATE TABLE IF NOT EXISTS digests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    created_at TEXT NOT NULL,
    text TEXT NOT NULL
);
"#;

/// Initializes the archive schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
