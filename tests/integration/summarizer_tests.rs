//! Summarizer tests against a mock chat-completions API

use news_sweep::config::{SummarizerConfig, SummaryMode};
use news_sweep::summarizer::{
    ChatCompletionsClient, ChunkPolicy, SummarizeError, Summarizer, SummaryPipeline,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn summarizer_config(endpoint: &str) -> SummarizerConfig {
    SummarizerConfig {
        mode: SummaryMode::PerArticle,
        endpoint: endpoint.to_string(),
        model: "test-model".to_string(),
        ..SummarizerConfig::default()
    }
}

fn reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    }))
}

#[tokio::test]
async fn test_chat_client_sends_prompt_and_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "messages": [
                { "role": "system", "content": "Be brief." },
                { "role": "user", "content": "Long article text" }
            ]
        })))
        .respond_with(reply("  Short summary. "))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = summarizer_config(&format!("{}/v1/", mock_server.uri()));
    let client = ChatCompletionsClient::new(&config, "test-key".to_string()).unwrap();

    let summary = client.complete("Be brief.", "Long article text").await.unwrap();
    assert_eq!(summary, "Short summary.");
}

#[tokio::test]
async fn test_chat_client_reports_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&mock_server)
        .await;

    let client =
        ChatCompletionsClient::new(&summarizer_config(&mock_server.uri()), "k".to_string())
            .unwrap();

    match client.complete("p", "t").await {
        Err(SummarizeError::Status { status, body }) => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("expected a status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_long_text_makes_one_call_per_chunk_plus_combine() {
    let mock_server = MockServer::start().await;

    // 10 characters in chunks of 4: three chunk calls and one combine call
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(reply("part"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let config = summarizer_config(&mock_server.uri());
    let client = ChatCompletionsClient::new(&config, "k".to_string()).unwrap();
    let pipeline = SummaryPipeline::new(
        Box::new(client),
        SummaryMode::Bulk,
        "Summarize.",
        "Combine.",
        ChunkPolicy::new(4),
    );

    let summary = pipeline.summarize("abcdefghij").await;
    assert_eq!(summary.calls, 4);
    assert_eq!(summary.failures, 0);
    assert_eq!(summary.text, "part");
}

#[tokio::test]
async fn test_api_failure_becomes_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let config = summarizer_config(&mock_server.uri());
    let client = ChatCompletionsClient::new(&config, "k".to_string()).unwrap();
    let pipeline = SummaryPipeline::new(
        Box::new(client),
        SummaryMode::PerArticle,
        "Summarize.",
        "Combine.",
        ChunkPolicy::new(4000),
    );

    let summary = pipeline.summarize("An article").await;
    assert!(summary.is_degraded());
    assert!(summary.text.starts_with("[summarization failed:"));
    assert!(summary.text.contains("500"));
}

#[test]
fn test_pipeline_requires_api_key() {
    let mut config = summarizer_config("https://api.example.com/v1");
    config.api_key_env = "NEWS_SWEEP_TEST_KEY_THAT_IS_NEVER_SET".to_string();

    assert!(matches!(
        SummaryPipeline::from_config(&config),
        Err(news_sweep::ConfigError::MissingApiKey(_))
    ));
}
