//! Provider trait for streaming text completion.
//!
//! The queue, the retry decorator and the HTTP client all meet at
//! [`CompletionProvider`]. Decorators wrap an `Arc<dyn CompletionProvider>`
//! and are themselves providers, so they compose:
//!
//! ```ignore
//! let client = Arc::new(GroqClient::new(Some(key), GroqOptions::default())?);
//! let provider = RetryingCompletionProvider::new(client, RetryConfig::default());
//! ```
//!
//! # Error Semantics
//!
//! `stream` returns `Err` when the call could not be established (rate
//! limit, bad credentials, unreachable host). Once `Ok` is returned, later
//! failures arrive as `Err` items inside the stream and end it.

use async_trait::async_trait;

use crate::Result;
use crate::types::{CompletionRequest, CompletionStream};

/// Provider for streaming text completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Start a streaming completion for `request`.
    ///
    /// The returned stream yields non-empty content deltas and ends with
    /// [`CompletionEvent::Done`](crate::CompletionEvent::Done).
    async fn stream(&self, request: &CompletionRequest) -> Result<CompletionStream>;
}
