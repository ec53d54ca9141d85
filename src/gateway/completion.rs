//! CompletionGateway - cache in front of the single-flight queue

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{info, instrument};

use super::queue::SingleFlightQueue;
use crate::cache::ResponseCache;
use crate::providers::RetryingCompletionProvider;
use crate::telemetry;
use crate::types::{CompletionEvent, CompletionRequest, CompletionStream, Message};
use crate::{HuginnError, Result};

/// Request counters exposed by [`CompletionGateway::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub queued_requests: u64,
    pub retries: u64,
}

#[derive(Default)]
struct Counters {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    queued_requests: AtomicU64,
}

/// Entry point for AI replies: answers from the response cache when it
/// can, otherwise queues the request behind every earlier one.
pub struct CompletionGateway {
    cache: Arc<ResponseCache>,
    queue: SingleFlightQueue,
    provider: Arc<RetryingCompletionProvider>,
    system_prompt: String,
    history_limit: usize,
    counters: Counters,
}

impl CompletionGateway {
    pub(crate) fn new(
        cache: Arc<ResponseCache>,
        queue: SingleFlightQueue,
        provider: Arc<RetryingCompletionProvider>,
        system_prompt: String,
        history_limit: usize,
    ) -> Self {
        Self {
            cache,
            queue,
            provider,
            system_prompt,
            history_limit,
            counters: Counters::default(),
        }
    }

    /// Build the provider request for a new user message.
    ///
    /// The turns are the system prompt, the most recent `history_limit`
    /// turns of `history`, then `message`.
    pub fn build_request(&self, message: &str, history: &[Message]) -> Result<CompletionRequest> {
        if message.trim().is_empty() {
            return Err(HuginnError::InvalidInput("message is required".to_string()));
        }

        let recent = &history[history.len().saturating_sub(self.history_limit)..];
        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(Message::system(self.system_prompt.as_str()));
        messages.extend(recent.iter().cloned());
        messages.push(Message::user(message));
        Ok(CompletionRequest::new(messages))
    }

    /// Stream a completion for `request`.
    ///
    /// A cache hit yields the stored text as a single fragment followed by
    /// `Done` without touching the queue. A miss is queued; its text is
    /// cached once the provider finishes.
    #[instrument(name = "gateway.complete", skip_all, fields(turns = request.messages().len()))]
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionStream> {
        let total = self.counters.total_requests.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::counter!(telemetry::REQUESTS_TOTAL).increment(1);

        if let Some(text) = self.cache.lookup(&request.fingerprint()).await {
            let hits = self.counters.cache_hits.fetch_add(1, Ordering::Relaxed) + 1;
            info!(
                hits,
                total,
                hit_rate = %format!("{:.1}%", hits as f64 / total as f64 * 100.0),
                "cache hit"
            );
            let events = [
                Ok(CompletionEvent::Content(text)),
                Ok(CompletionEvent::Done),
            ];
            return Ok(Box::pin(futures_util::stream::iter(events)));
        }

        let submission = self.queue.submit(request)?;
        self.counters.queued_requests.fetch_add(1, Ordering::Relaxed);
        Ok(submission.events)
    }

    /// Snapshot of the request counters.
    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            total_requests: self.counters.total_requests.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            queued_requests: self.counters.queued_requests.load(Ordering::Relaxed),
            retries: self.provider.retries(),
        }
    }

    /// Entries waiting behind the one in flight.
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }
}
