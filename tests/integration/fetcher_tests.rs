//! HTTP fetcher tests against a mock news site

use news_sweep::config::{CrawlerConfig, UserAgentConfig};
use news_sweep::crawler::{FetchResult, HttpFetcher, PageFetcher};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crawler_config(base: &str, timeout_secs: u64) -> CrawlerConfig {
    CrawlerConfig {
        base_url_template: format!("{}/list/1", base),
        max_empty_retries: 3,
        inter_request_delay_ms: 0,
        empty_page_delay_ms: 0,
        max_empty_page_delay_ms: 0,
        request_timeout_secs: timeout_secs,
        encoding: "utf-8".to_string(),
        max_pages: None,
        max_run_seconds: None,
    }
}

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        value: "NewsSweepTest/1.0".to_string(),
    }
}

#[tokio::test]
async fn test_fetch_success_sends_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list/7"))
        .and(header("user-agent", "NewsSweepTest/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>seven</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(&crawler_config(&mock_server.uri(), 5), &user_agent()).unwrap();
    let result = fetcher.fetch(7).await;

    assert_eq!(
        result,
        FetchResult::Success {
            body: "<html>seven</html>".to_string(),
            status_code: 200,
        }
    );
}

#[tokio::test]
async fn test_fetch_not_found_is_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list/8"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(&crawler_config(&mock_server.uri(), 5), &user_agent()).unwrap();

    assert_eq!(
        fetcher.fetch(8).await,
        FetchResult::HttpError { status_code: 404 }
    );
}

#[tokio::test]
async fn test_fetch_redirect_target_counts_as_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list/9"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "/archive/9"),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/archive/9"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>moved</p>"))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(&crawler_config(&mock_server.uri(), 5), &user_agent()).unwrap();
    assert!(fetcher.fetch(9).await.is_success());
}

#[tokio::test]
async fn test_fetch_timeout_is_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(&crawler_config(&mock_server.uri(), 1), &user_agent()).unwrap();

    match fetcher.fetch(1).await {
        FetchResult::TransientFailure { reason } => assert!(reason.contains("timeout")),
        other => panic!("expected a transient failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_connection_refused_is_transient() {
    // Nothing listens on port 1
    let uri = "http://127.0.0.1:1".to_string();

    let fetcher = HttpFetcher::new(&crawler_config(&uri, 2), &user_agent()).unwrap();

    assert!(matches!(
        fetcher.fetch(1).await,
        FetchResult::TransientFailure { .. }
    ));
}
