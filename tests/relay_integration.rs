//! Integration tests for the chat relay
//!
//! The upstream provider is faked with a mockito server; the relay itself
//! is exercised both at the client layer and over a real HTTP round trip.

use chat_relay::api::{build_router, AppState};
use chat_relay::chat::{ChatOrchestrator, Message};
use chat_relay::config::RelayConfig;
use chat_relay::upstream::{
    CompletionBackend, CompletionCall, OpenAiClient, UpstreamError,
};
use futures::StreamExt;
use mockito::Matcher;
use std::sync::Arc;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

fn stream_event(content: &str) -> String {
    format!(r#"{{"choices":[{{"delta":{{"content":"{}"}}}}]}}"#, content)
}

fn stream_body(contents: &[&str]) -> String {
    let mut body = String::new();
    for (i, content) in contents.iter().enumerate() {
        if i > 0 {
            body.push_str("\n\n");
        }
        body.push_str("data: ");
        body.push_str(&stream_event(content));
    }
    body.push_str("\n\ndata: [DONE]\n\n");
    body
}

fn call(messages: Vec<Message>) -> CompletionCall {
    CompletionCall {
        api_key: "sk-test".to_string(),
        system_prompt: "be helpful".to_string(),
        messages,
        max_tokens: 3000,
        temperature: 0.3,
    }
}

fn client_for(server: &mockito::Server) -> OpenAiClient {
    let mut config = RelayConfig::default();
    config.upstream.endpoint = format!("{}{}", server.url(), COMPLETIONS_PATH);
    OpenAiClient::new(config.upstream).unwrap()
}

/// Spin up the full relay against the given upstream endpoint, returning
/// its base URL.
async fn start_relay(upstream_endpoint: String) -> String {
    let mut config = RelayConfig::default();
    config.upstream.endpoint = upstream_endpoint;

    let backend = Arc::new(OpenAiClient::new(config.upstream.clone()).unwrap());
    let orchestrator = Arc::new(ChatOrchestrator::new(backend, &config));
    let router = build_router(AppState { orchestrator }, config.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

fn words(count: usize) -> String {
    vec!["word"; count].join(" ")
}

#[tokio::test]
async fn test_streaming_client_decodes_fragments() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETIONS_PATH)
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "stream": true,
            "model": "gpt-3.5-turbo",
        })))
        .with_status(200)
        .with_body(stream_body(&["The answer", " is", " 42."]))
        .create_async()
        .await;

    let client = client_for(&server);
    let stream = client
        .complete_stream(call(vec![Message::user("What is the answer?")]))
        .await
        .unwrap();

    let fragments: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
    assert_eq!(fragments.concat(), "The answer is 42.");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_streaming_client_returns_first_choice() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETIONS_PATH)
        .match_body(Matcher::PartialJson(serde_json::json!({ "stream": false })))
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"A summary."}}]}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let text = client
        .complete(call(vec![Message::user("Summarize this")]))
        .await
        .unwrap();

    assert_eq!(text, "A summary.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_maps_401_to_auth_rejected() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(401)
        .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client
        .complete_stream(call(vec![Message::user("Hi")]))
        .await;

    assert!(matches!(result, Err(UpstreamError::AuthRejected)));
}

#[tokio::test]
async fn test_client_carries_upstream_error_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(429)
        .with_body("slow down")
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client.complete(call(vec![Message::user("Hi")])).await;

    match result {
        Err(UpstreamError::Api { status, message }) => {
            assert_eq!(status, 429);
            assert!(message.contains("slow down"));
        }
        other => panic!("expected Api error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_malformed_stream_surfaces_decode_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(200)
        .with_body("data: {broken\n\n")
        .create_async()
        .await;

    let client = client_for(&server);
    let stream = client
        .complete_stream(call(vec![Message::user("Hi")]))
        .await
        .unwrap();

    let items: Vec<Result<String, UpstreamError>> = stream.collect().await;
    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(UpstreamError::Decode(_))));
}

#[tokio::test]
async fn test_relay_streams_plain_text() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(200)
        .with_body(stream_body(&["Hello", " from", " upstream"]))
        .create_async()
        .await;

    let relay = start_relay(format!("{}{}", server.url(), COMPLETIONS_PATH)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/chat", relay))
        .json(&serde_json::json!({
            "apiKey": "sk-test",
            "messages": [{"role": "user", "content": "Hi"}]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "application/octet-stream"
    );
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let body = response.text().await.unwrap();
    assert_eq!(body, "Hello from upstream");
}

#[tokio::test]
async fn test_relay_appends_context_block_when_history_overflows() {
    let mut server = mockito::Server::new_async().await;

    // Summarization call (non-streaming) must come first, exactly once
    let summarize_mock = server
        .mock("POST", COMPLETIONS_PATH)
        .match_body(Matcher::PartialJson(serde_json::json!({ "stream": false })))
        .with_status(200)
        .with_body(
            r#"{"choices":[{"message":{"role":"assistant","content":"a compact summary"}}]}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let complete_mock = server
        .mock("POST", COMPLETIONS_PATH)
        .match_body(Matcher::PartialJson(serde_json::json!({ "stream": true })))
        .with_status(200)
        .with_body(stream_body(&["Sure."]))
        .expect(1)
        .create_async()
        .await;

    let relay = start_relay(format!("{}{}", server.url(), COMPLETIONS_PATH)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/chat", relay))
        .json(&serde_json::json!({
            "apiKey": "sk-test",
            "messages": [
                {"role": "user", "content": words(400)},
                {"role": "assistant", "content": words(400)},
                {"role": "user", "content": "and now?"}
            ]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(
        body,
        "Sure.-----Context Start-----\na compact summary\n-----Context End-----"
    );

    summarize_mock.assert_async().await;
    complete_mock.assert_async().await;
}

#[tokio::test]
async fn test_relay_rejects_oversized_turn_without_upstream_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETIONS_PATH)
        .expect(0)
        .create_async()
        .await;

    let relay = start_relay(format!("{}{}", server.url(), COMPLETIONS_PATH)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/chat", relay))
        .json(&serde_json::json!({
            "apiKey": "sk-test",
            "messages": [{"role": "user", "content": words(900)}]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errorCode"], 1);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_relay_maps_upstream_auth_rejection() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(401)
        .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
        .create_async()
        .await;

    let relay = start_relay(format!("{}{}", server.url(), COMPLETIONS_PATH)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/chat", relay))
        .json(&serde_json::json!({
            "apiKey": "sk-wrong",
            "messages": [{"role": "user", "content": "Hi"}]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errorCode"], 2);
}

#[tokio::test]
async fn test_relay_rejects_empty_dialogue() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETIONS_PATH)
        .expect(0)
        .create_async()
        .await;

    let relay = start_relay(format!("{}{}", server.url(), COMPLETIONS_PATH)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/chat", relay))
        .json(&serde_json::json!({ "apiKey": "sk-test", "messages": [] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errorCode"], 99999);

    mock.assert_async().await;
}
