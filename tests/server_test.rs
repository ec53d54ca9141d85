//! End-to-end tests for the HTTP surface, served on an ephemeral port.

#![cfg(feature = "server")]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use huginn::chat::RelayHub;
use huginn::extract::{DEFAULT_FETCH_TIMEOUT, PageFetcher};
use huginn::providers::traits::CompletionProvider;
use huginn::server::{AppState, router};
use huginn::{
    CompletionEvent, CompletionGateway, CompletionRequest, CompletionStream, Huginn, HuginnError,
    Result,
};

// ============================================================================
// Helpers
// ============================================================================

/// Streams "Hi" + " there", or a scripted failure mid-stream.
struct ScriptedProvider {
    fail_mid_stream: bool,
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, _request: &CompletionRequest) -> Result<CompletionStream> {
        let tail = if self.fail_mid_stream {
            Err(HuginnError::Stream("connection reset".into()))
        } else {
            Ok(CompletionEvent::Content(" there".into()))
        };
        Ok(Box::pin(futures_util::stream::iter(vec![
            Ok(CompletionEvent::Content("Hi".into())),
            tail,
            Ok(CompletionEvent::Done),
        ])))
    }
}

fn scripted(fail_mid_stream: bool) -> CompletionGateway {
    Huginn::builder()
        .provider(Arc::new(ScriptedProvider { fail_mid_stream }))
        .pacing(Duration::ZERO)
        .build()
        .unwrap()
}

/// Serve the router on 127.0.0.1 and return its base URL.
async fn serve(gateway: CompletionGateway) -> String {
    let state = AppState {
        gateway: Arc::new(gateway),
        hub: Arc::new(RelayHub::default()),
        fetcher: PageFetcher::new(DEFAULT_FETCH_TIMEOUT).unwrap(),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state, None)).await.unwrap();
    });
    format!("http://{addr}")
}

fn data_lines(body: &str) -> Vec<&str> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect()
}

// ============================================================================
// /api/chat
// ============================================================================

#[tokio::test]
async fn chat_streams_server_sent_events() {
    let base = serve(scripted(false)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/chat"))
        .json(&json!({"message": "hello", "chatHistory": []}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    let body = response.text().await.unwrap();
    assert_eq!(
        data_lines(&body),
        vec![r#"{"content":"Hi"}"#, r#"{"content":" there"}"#, "[DONE]"]
    );
}

#[tokio::test]
async fn chat_reports_mid_stream_failure_as_event() {
    let base = serve(scripted(true)).await;

    let body = reqwest::Client::new()
        .post(format!("{base}/api/chat"))
        .json(&json!({"message": "hello"}))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let lines = data_lines(&body);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], r#"{"content":"Hi"}"#);
    let error: Value = serde_json::from_str(lines[1]).unwrap();
    assert!(error["error"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let base = serve(scripted(false)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/chat"))
        .json(&json!({"message": "   "}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "message is required");
}

#[tokio::test]
async fn missing_api_key_is_service_unavailable() {
    let gateway = Huginn::builder()
        .groq(None, Default::default())
        .build()
        .unwrap();
    let base = serve(gateway).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/chat"))
        .json(&json!({"message": "hello"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("API key"));
}

// ============================================================================
// Other routes
// ============================================================================

#[tokio::test]
async fn stats_reflect_cache_hits() {
    let base = serve(scripted(false)).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        client
            .post(format!("{base}/api/chat"))
            .json(&json!({"message": "same question"}))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
    }

    let stats: Value = client
        .get(format!("{base}/api/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats["totalRequests"], 2);
    assert_eq!(stats["cacheHits"], 1);
    assert_eq!(stats["queuedRequests"], 1);
    assert_eq!(stats["retries"], 0);
    assert_eq!(stats["queueLength"], 0);
    assert_eq!(stats["connectedUsers"], 0);
}

#[tokio::test]
async fn shorten_route() {
    let base = serve(scripted(false)).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{base}/api/shorten"))
        .json(&json!({"text": "Short enough."}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["text"], "Short enough.");
}

#[tokio::test]
async fn fetch_url_requires_url() {
    let base = serve(scripted(false)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/fetch-url"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn mistyped_url_is_a_json_bad_request() {
    let base = serve(scripted(false)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/fetch-url"))
        .json(&json!({"url": 42}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn body_without_content_type_is_a_json_bad_request() {
    let base = serve(scripted(false)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/chat"))
        .body(r#"{"message":"hi"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/json")
    );
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Content-Type"));
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let base = serve(scripted(false)).await;
    let client = reqwest::Client::new();

    let cases = [
        ("/api/chat", json!({"message": "hi", "chatHistory": [{"role": "user"}]})),
        ("/api/shorten", json!({})),
    ];
    for (route, payload) in cases {
        let response = client
            .post(format!("{base}{route}"))
            .json(&payload)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400, "route {route}");
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string(), "route {route}");
    }

    let response = client
        .post(format!("{base}/api/chat"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn health_reports_version() {
    let base = serve(scripted(false)).await;

    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], huginn::PKG_VERSION);
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let base = serve(scripted(false)).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/health"))
        .header("origin", "http://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
