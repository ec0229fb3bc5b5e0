//! Integration tests for the crawl loop
//!
//! These tests run the full coordinator against a wiremock news site and a
//! real cursor file, covering resumption across runs.

use news_sweep::config::{
    Config, CrawlerConfig, CursorConfig, OutputConfig, SelectorConfig, SummarizerConfig,
    UserAgentConfig,
};
use news_sweep::crawler::{Coordinator, PageEvent};
use news_sweep::output::{build_sinks, MemorySink, SqliteArchive};
use news_sweep::state::TerminationReason;
use news_sweep::storage::{CursorLease, CursorStore, FileCursorStore, StorageError};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling `base` with the cursor at `cursor_path`
fn create_test_config(base: &str, cursor_path: &Path, max_empty_retries: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            base_url_template: format!("{}/list/1", base),
            max_empty_retries,
            inter_request_delay_ms: 0,
            empty_page_delay_ms: 0,
            max_empty_page_delay_ms: 0,
            request_timeout_secs: 5,
            encoding: "utf-8".to_string(),
            max_pages: None,
            max_run_seconds: None,
        },
        user_agent: UserAgentConfig {
            value: "NewsSweepTest/1.0".to_string(),
        },
        selectors: SelectorConfig {
            container: "div.news-item".to_string(),
            title: "h3".to_string(),
            time: "span.time".to_string(),
            body: "div.content".to_string(),
            icon: "img, svg, i".to_string(),
            skip_empty: false,
        },
        cursor: CursorConfig {
            path: cursor_path.display().to_string(),
        },
        summarizer: SummarizerConfig::default(),
        output: OutputConfig::default(),
    }
}

fn listing_page(titles: &[&str]) -> String {
    let items: String = titles
        .iter()
        .map(|title| {
            format!(
                r#"<div class="news-item">
                     <h3>{title}</h3>
                     <span class="time"><i class="icon-clock"></i> 2024-05-01 08:00</span>
                     <div class="content">{title} happened today.</div>
                   </div>"#
            )
        })
        .collect();
    format!("<html><head><title>Latest</title></head><body>{}</body></html>", items)
}

async fn mount_page(server: &MockServer, sequence: u64, titles: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/list/{}", sequence)))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(titles)))
        .mount(server)
        .await;
}

fn write_cursor(path: &Path, value: u64) {
    FileCursorStore::new(path).save(value).unwrap();
}

fn read_cursor(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_crawl_stops_after_empty_streak_and_persists_first_empty_page() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cursor_path = dir.path().join("cursor.txt");

    mount_page(&mock_server, 1, &["Rates rise", "Storm warning"]).await;
    mount_page(&mock_server, 2, &["Election day"]).await;
    // Every other page is a 404 from wiremock

    write_cursor(&cursor_path, 1);
    let config = create_test_config(&mock_server.uri(), &cursor_path, 3);

    let mut coordinator = Coordinator::from_config(&config).unwrap();
    assert_eq!(coordinator.cursor(), 1);

    let mut sink = MemorySink::default();
    let report = coordinator.run(&mut sink, None).await.unwrap();

    assert_eq!(
        report.termination,
        Some(TerminationReason::MaxEmptyRetriesExceeded)
    );
    assert_eq!(report.productive_pages, 2);
    assert_eq!(report.empty_page_count(), 3);
    assert_eq!(report.records, 3);
    assert_eq!(report.resume_cursor, 3);
    assert_eq!(read_cursor(&cursor_path).trim(), "3");

    let titles: Vec<&str> = sink.articles.iter().map(|(a, _)| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Rates rise", "Storm warning", "Election day"]);

    let first = &sink.articles[0].0;
    assert_eq!(first.sequence, 1);
    assert_eq!(first.publish_time.as_deref(), Some("2024-05-01 08:00"));
    assert_eq!(first.content, "Rates rise happened today.");
    assert!(first.source_url.ends_with("/list/1"));
    assert!(sink.finalized.is_some());
}

#[tokio::test]
async fn test_second_run_resumes_where_first_stopped() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cursor_path = dir.path().join("state").join("cursor.txt");

    mount_page(&mock_server, 5, &["Monday"]).await;
    write_cursor(&cursor_path, 5);
    let config = create_test_config(&mock_server.uri(), &cursor_path, 2);

    let mut sink = MemorySink::default();
    let first = Coordinator::from_config(&config)
        .unwrap()
        .run(&mut sink, None)
        .await
        .unwrap();
    assert_eq!(first.resume_cursor, 6);

    // Page 6 is published between runs
    mount_page(&mock_server, 6, &["Tuesday"]).await;

    let mut coordinator = Coordinator::from_config(&config).unwrap();
    assert_eq!(coordinator.start_cursor(), 6);

    let mut sink = MemorySink::default();
    let second = coordinator.run(&mut sink, None).await.unwrap();

    assert_eq!(sink.articles.len(), 1);
    assert_eq!(sink.articles[0].0.title, "Tuesday");
    assert_eq!(second.resume_cursor, 7);
    assert_eq!(read_cursor(&cursor_path).trim(), "7");
}

#[tokio::test]
async fn test_server_errors_count_towards_streak() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cursor_path = dir.path().join("cursor.txt");

    Mock::given(method("GET"))
        .and(path("/list/0"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, 1, &["Recovered"]).await;

    let config = create_test_config(&mock_server.uri(), &cursor_path, 2);
    let mut coordinator = Coordinator::from_config(&config).unwrap();
    assert_eq!(coordinator.cursor(), 0);

    let first = coordinator.next_page().await.unwrap();
    assert!(matches!(first, PageEvent::Empty { sequence: 0, .. }));
    // The streak alone does not move the checkpoint
    assert!(!cursor_path.exists());

    let second = coordinator.next_page().await.unwrap();
    assert!(matches!(second, PageEvent::Articles { sequence: 1, .. }));
    assert_eq!(read_cursor(&cursor_path).trim(), "2");
}

#[tokio::test]
async fn test_cancellation_before_first_page() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cursor_path = dir.path().join("cursor.txt");
    write_cursor(&cursor_path, 4);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&["x"])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &cursor_path, 3);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut sink = MemorySink::default();
    let report = news_sweep::crawler::run_crawl(&config, &mut sink, None, cancel)
        .await
        .unwrap();

    assert_eq!(report.termination, Some(TerminationReason::Cancelled));
    assert_eq!(report.pages_fetched(), 0);
    assert_eq!(read_cursor(&cursor_path).trim(), "4");
}

#[tokio::test]
async fn test_page_limit_stops_crawl() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cursor_path = dir.path().join("cursor.txt");

    for sequence in 0..10 {
        mount_page(&mock_server, sequence, &["Daily"]).await;
    }

    let mut config = create_test_config(&mock_server.uri(), &cursor_path, 3);
    config.crawler.max_pages = Some(4);

    let mut sink = MemorySink::default();
    let report = Coordinator::from_config(&config)
        .unwrap()
        .run(&mut sink, None)
        .await
        .unwrap();

    assert_eq!(report.termination, Some(TerminationReason::MaxPagesReached));
    assert_eq!(report.pages_fetched(), 4);
    assert_eq!(read_cursor(&cursor_path).trim(), "4");
}

#[tokio::test]
async fn test_crawl_into_archive_and_digest() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cursor_path = dir.path().join("cursor.txt");
    let db_path = dir.path().join("articles.db");
    let digest_path = dir.path().join("digest.md");

    mount_page(&mock_server, 0, &["Harbor opens", "Bridge closes"]).await;

    let mut config = create_test_config(&mock_server.uri(), &cursor_path, 1);
    config.output = OutputConfig {
        summary_path: Some(digest_path.display().to_string()),
        database_path: Some(db_path.display().to_string()),
    };

    let mut coordinator = Coordinator::from_config(&config).unwrap();
    let mut sinks = build_sinks(&config.output, "test-hash", coordinator.cursor()).unwrap();
    let report = coordinator.run(&mut sinks, None).await.unwrap();
    drop(sinks);

    assert_eq!(report.records, 2);

    let archive = SqliteArchive::open(&db_path).unwrap();
    assert_eq!(archive.count_articles().unwrap(), 2);
    let run = archive.latest_run().unwrap().unwrap();
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.resume_cursor, Some(1));

    let digest = std::fs::read_to_string(&digest_path).unwrap();
    assert!(digest.contains("### Harbor opens"));
    assert!(digest.contains("### Bridge closes"));
}

#[tokio::test]
async fn test_lease_blocks_second_crawler() {
    let dir = tempfile::tempdir().unwrap();
    let cursor_path = dir.path().join("cursor.txt");

    let lease = CursorLease::acquire(&cursor_path).unwrap();
    assert!(matches!(
        CursorLease::acquire(&cursor_path),
        Err(StorageError::Locked { .. })
    ));

    drop(lease);
    assert!(CursorLease::acquire(&cursor_path).is_ok());
}
