//! End-to-end runs against a mock Ollama server on localhost

use mockito::{Matcher, Server};
use ollama_runners::core::client::OllamaClient;
use ollama_runners::core::config::{ApiKey, ChatConfig, ConfigError};
use ollama_runners::core::provider::{ChatProvider, ExtractionService, ProviderError};
use ollama_runners::core::providers::SmartScraper;
use ollama_runners::models::graph::{ExtractionRequest, GraphConfig};
use ollama_runners::runner::RunError;
use ollama_runners::runner::chat::{self, ChatSession, default_messages};
use ollama_runners::runner::extraction::submit;
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;
use url::Url;

fn ndjson(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        let line = json!({
            "model": "gpt-oss:120b",
            "created_at": "2025-09-20T10:00:00Z",
            "message": {"role": "assistant", "content": fragment},
            "done": false
        });
        body.push_str(&line.to_string());
        body.push('\n');
    }
    body.push_str(r#"{"model":"gpt-oss:120b","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}"#);
    body.push('\n');
    body
}

fn chat_config(server: &Server) -> ChatConfig {
    ChatConfig {
        host: Url::parse(&server.url()).unwrap(),
        request_timeout: Some(10),
        ..ChatConfig::default()
    }
}

fn graph_config(server: &Server) -> GraphConfig {
    let base = Url::parse(&server.url()).unwrap();
    let mut config = GraphConfig::default();
    config.llm.base_url = base.clone();
    config.embedding.base_url = base;
    config.request_timeout = Some(10);
    config
}

#[tokio::test]
async fn streams_reply_with_bearer_credential() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_header("authorization", "Bearer stub-key-123")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-oss:120b",
            "stream": true,
            "messages": [{"role": "user", "content": "Why is the sky blue?"}]
        })))
        .with_status(200)
        .with_header("content-type", "application/x-ndjson")
        .with_body(ndjson(&[
            "The sky ",
            "looks blue ",
            "because of Rayleigh scattering.",
        ]))
        .expect(1)
        .create_async()
        .await;

    let key = ApiKey::new("stub-key-123").unwrap();
    let session = ChatSession::new(&chat_config(&server), &key, default_messages()).unwrap();
    let mut out = Vec::new();

    let reply = session.stream_to(&mut out).await.unwrap();
    assert_eq!(reply, "The sky looks blue because of Rayleigh scattering.");
    assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", reply));
    mock.assert_async().await;
}

#[tokio::test]
async fn rejected_credential_is_an_authentication_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_header("authorization", "Bearer wrong")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"unauthorized"}"#)
        .expect(1)
        .create_async()
        .await;

    let key = ApiKey::new("wrong").unwrap();
    let session = ChatSession::new(&chat_config(&server), &key, default_messages()).unwrap();
    let mut out = Vec::new();

    let result = session.stream_to(&mut out).await;
    assert!(matches!(
        result,
        Err(RunError::Provider(ProviderError::Authentication(_)))
    ));
    assert!(out.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_credential_stops_before_any_request() {
    if std::env::var("OLLAMA_API_KEY").is_ok() {
        eprintln!("OLLAMA_API_KEY is set in the environment; skipping");
        return;
    }

    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .with_status(200)
        .expect(0)
        .create_async()
        .await;

    let mut env_file = NamedTempFile::new().unwrap();
    writeln!(env_file, "OTHER_SETTING=1").unwrap();
    env_file.flush().unwrap();

    let config = ChatConfig {
        env_file: env_file.path().to_path_buf(),
        ..chat_config(&server)
    };
    let mut out = Vec::new();

    let result = chat::run(&config, &mut out).await;
    assert!(matches!(
        result,
        Err(RunError::Config(ConfigError::MissingApiKey))
    ));
    assert!(out.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn embed_returns_vectors_in_order() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/embed")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::PartialJson(json!({
            "model": "nomic-embed-text",
            "input": ["a", "b"]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"model":"nomic-embed-text","embeddings":[[0.1,0.2],[0.3,0.4]]}"#)
        .expect(1)
        .create_async()
        .await;

    let host = Url::parse(&server.url()).unwrap();
    let client = OllamaClient::new(host, None, Some(10)).unwrap();
    let vectors = client
        .embed("nomic-embed-text", vec!["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    mock.assert_async().await;
}

#[tokio::test]
async fn smart_scraper_answers_from_fetched_page() {
    let mut server = Server::new_async().await;
    let page = server
        .mock("GET", "/wiki/Alpaca")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(
            "<html><head><title>Alpaca - Wikipedia</title></head>\
             <body><h1>Alpaca</h1><p>A South American camelid.</p></body></html>",
        )
        .expect(1)
        .create_async()
        .await;
    let answer = json!({
        "model": "phi3:mini",
        "message": {"role": "assistant", "content": "{\"title\": \"Alpaca\"}"},
        "done": true
    });
    let llm = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({
            "model": "phi3:mini",
            "format": "json",
            "stream": false,
            "options": {"num_ctx": 8192}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(answer.to_string())
        .expect(1)
        .create_async()
        .await;
    // A page this small fits the context window, so nothing is embedded.
    let embed = server
        .mock("POST", "/api/embed")
        .expect(0)
        .create_async()
        .await;

    let source = format!("{}/wiki/Alpaca", server.url());
    let request = ExtractionRequest::new(
        "Hello! Tell me the title of the topic in the source",
        &source,
        graph_config(&server),
    )
    .unwrap();

    let scraper = SmartScraper::from_config(&request.config).unwrap();
    assert_eq!(scraper.service_name(), "SmartScraper");
    let mut out = Vec::new();
    let result = submit(&scraper, &request, &mut out).await.unwrap();

    assert_eq!(result, json!({"title": "Alpaca"}));
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "{\n  \"title\": \"Alpaca\"\n}\n"
    );
    page.assert_async().await;
    llm.assert_async().await;
    embed.assert_async().await;
}

#[tokio::test]
async fn missing_page_is_a_fetch_error() {
    let mut server = Server::new_async().await;
    let page = server
        .mock("GET", "/gone")
        .with_status(404)
        .with_body("not found")
        .expect(1)
        .create_async()
        .await;
    let llm = server
        .mock("POST", "/api/chat")
        .expect(0)
        .create_async()
        .await;

    let source = format!("{}/gone", server.url());
    let request = ExtractionRequest::new("title?", &source, graph_config(&server)).unwrap();

    let scraper = SmartScraper::from_config(&request.config).unwrap();
    let result = scraper.run(&request).await;
    assert!(matches!(result, Err(ProviderError::Fetch { .. })));
    page.assert_async().await;
    llm.assert_async().await;
}
