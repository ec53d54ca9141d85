//! Tests for [`CompletionGateway`]: cache in front of the queue, request
//! building and statistics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;

use huginn::gateway::{DEFAULT_HISTORY_LIMIT, DEFAULT_SYSTEM_PROMPT};
use huginn::providers::traits::CompletionProvider;
use huginn::{
    CacheConfig, CompletionEvent, CompletionGateway, CompletionRequest, CompletionStream, Huginn,
    HuginnError, Message, Result, RetryConfig, Role,
};

// ============================================================================
// Mock provider
// ============================================================================

/// Streams "Hel" + "lo" and counts calls. Optionally rate limits first.
struct CountingProvider {
    calls: AtomicU32,
    rate_limits: AtomicU32,
}

impl CountingProvider {
    fn new() -> Self {
        Self::rate_limiting(0)
    }

    fn rate_limiting(times: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            rate_limits: AtomicU32::new(times),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    async fn stream(&self, _request: &CompletionRequest) -> Result<CompletionStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .rate_limits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(HuginnError::RateLimited);
        }
        Ok(Box::pin(futures_util::stream::iter(vec![
            Ok(CompletionEvent::Content("Hel".into())),
            Ok(CompletionEvent::Content("lo".into())),
            Ok(CompletionEvent::Done),
        ])))
    }
}

fn gateway(provider: Arc<CountingProvider>, cache: CacheConfig) -> CompletionGateway {
    Huginn::builder()
        .provider(provider)
        .response_cache(cache)
        .pacing(Duration::ZERO)
        .retry(RetryConfig::new().initial_delay(Duration::from_millis(1)))
        .build()
        .unwrap()
}

async fn collect(gateway: &CompletionGateway, message: &str) -> Vec<CompletionEvent> {
    let request = gateway.build_request(message, &[]).unwrap();
    let stream = gateway.complete(request).await.unwrap();
    stream.map(|e| e.unwrap()).collect().await
}

// ============================================================================
// Cache in front of the queue
// ============================================================================

#[tokio::test]
async fn second_identical_request_is_served_from_cache() {
    let provider = Arc::new(CountingProvider::new());
    let gateway = gateway(provider.clone(), CacheConfig::default());

    let first = collect(&gateway, "hello").await;
    assert_eq!(
        first,
        vec![
            CompletionEvent::Content("Hel".into()),
            CompletionEvent::Content("lo".into()),
            CompletionEvent::Done,
        ]
    );

    let second = collect(&gateway, "hello").await;
    assert_eq!(
        second,
        vec![CompletionEvent::Content("Hello".into()), CompletionEvent::Done]
    );
    assert_eq!(provider.calls(), 1);

    let stats = gateway.stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.queued_requests, 1);
    assert_eq!(stats.retries, 0);
}

#[tokio::test]
async fn different_history_misses_the_cache() {
    let provider = Arc::new(CountingProvider::new());
    let gateway = gateway(provider.clone(), CacheConfig::default());

    collect(&gateway, "hello").await;

    let history = [Message::user("earlier"), Message::assistant("reply")];
    let request = gateway.build_request("hello", &history).unwrap();
    let _: Vec<_> = gateway.complete(request).await.unwrap().collect().await;

    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn expired_entry_goes_back_to_the_provider() {
    let provider = Arc::new(CountingProvider::new());
    let gateway = gateway(
        provider.clone(),
        CacheConfig::new().ttl(Duration::from_millis(50)),
    );

    collect(&gateway, "hello").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    collect(&gateway, "hello").await;

    assert_eq!(provider.calls(), 2);
    assert_eq!(gateway.stats().cache_hits, 0);
}

#[tokio::test(start_paused = true)]
async fn retries_show_up_in_stats() {
    let provider = Arc::new(CountingProvider::rate_limiting(2));
    let gateway = gateway(provider.clone(), CacheConfig::default());

    let events = collect(&gateway, "hello").await;

    assert_eq!(events.last(), Some(&CompletionEvent::Done));
    assert_eq!(provider.calls(), 3);
    assert_eq!(gateway.stats().retries, 2);
}

// ============================================================================
// Request building
// ============================================================================

#[tokio::test]
async fn build_request_layout() {
    let gateway = gateway(Arc::new(CountingProvider::new()), CacheConfig::default());
    let history = [Message::user("q1"), Message::assistant("a1")];

    let request = gateway.build_request("q2", &history).unwrap();
    let turns = request.messages();

    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0].role, Role::System);
    assert_eq!(turns[0].content, DEFAULT_SYSTEM_PROMPT);
    assert_eq!(&turns[1..3], &history);
    assert_eq!(turns[3], Message::user("q2"));
}

#[tokio::test]
async fn build_request_keeps_only_recent_history() {
    let gateway = gateway(Arc::new(CountingProvider::new()), CacheConfig::default());
    let history: Vec<Message> = (0..25).map(|i| Message::user(format!("m{i}"))).collect();

    let request = gateway.build_request("now", &history).unwrap();
    let turns = request.messages();

    assert_eq!(turns.len(), DEFAULT_HISTORY_LIMIT + 2);
    assert_eq!(turns[1].content, "m15");
    assert_eq!(turns[DEFAULT_HISTORY_LIMIT].content, "m24");
}

#[tokio::test]
async fn build_request_rejects_blank_message() {
    let gateway = gateway(Arc::new(CountingProvider::new()), CacheConfig::default());

    for blank in ["", "   ", "\n\t"] {
        let result = gateway.build_request(blank, &[]);
        assert!(matches!(result, Err(HuginnError::InvalidInput(_))));
    }
}

#[tokio::test]
async fn custom_system_prompt_and_history_limit() {
    let gateway = Huginn::builder()
        .provider(Arc::new(CountingProvider::new()))
        .system_prompt("Answer in haiku.")
        .history_limit(1)
        .build()
        .unwrap();
    let history = [Message::user("old"), Message::user("recent")];

    let request = gateway.build_request("now", &history).unwrap();

    assert_eq!(
        request.messages(),
        &[
            Message::system("Answer in haiku."),
            Message::user("recent"),
            Message::user("now"),
        ]
    );
}

// ============================================================================
// Builder
// ============================================================================

#[tokio::test]
async fn builder_without_provider_fails() {
    let result = Huginn::builder().build();
    assert!(matches!(result, Err(HuginnError::Configuration(_))));
}

#[tokio::test]
async fn groq_without_key_fails_at_request_time() {
    let gateway = Huginn::builder()
        .groq(None, Default::default())
        .build()
        .unwrap();
    let request = gateway.build_request("hello", &[]).unwrap();

    let mut events = gateway.complete(request).await.unwrap();
    let first = events.next().await.unwrap();

    assert!(matches!(first, Err(HuginnError::MissingApiKey)));
}
