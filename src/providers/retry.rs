//! Retry configuration, delay calculation, and the retrying provider
//! decorator.
//!
//! [`RetryingCompletionProvider`] wraps any [`CompletionProvider`] and
//! retries call establishment when the provider signals rate limiting.
//! The loop itself lives in the shared `with_retry()` helper.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::traits::CompletionProvider;
use crate::Result;
use crate::telemetry;
use crate::types::{CompletionRequest, CompletionStream};

/// Configuration for retry behaviour on rate limiting.
///
/// Uses strictly doubling exponential backoff:
///
/// ```rust
/// # use huginn::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// assert_eq!(config.delay_for_attempt(2), Duration::from_millis(800));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 10.
    pub max_attempts: u32,
    /// Delay after the first failed attempt. Default: 500ms.
    pub initial_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    /// Create a new config with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the delay after the first failed attempt.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay after a failed attempt (0-indexed): `initial_delay * 2^attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

// ============================================================================
// Shared retry helper
// ============================================================================

/// Execute an async operation with retry logic.
///
/// Retries errors classified by [`HuginnError::is_retryable()`](crate::HuginnError::is_retryable)
/// up to `config.max_attempts` total attempts, sleeping
/// [`RetryConfig::delay_for_attempt`] between them. Every other error, and
/// the error of the final attempt, is returned immediately.
///
/// `on_retry` is invoked once per retry, before the backoff sleep.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider_name: &str,
    mut on_retry: impl FnMut(),
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt + 1 < config.max_attempts => {
                let delay = config.delay_for_attempt(attempt);
                on_retry();
                metrics::counter!(telemetry::RETRIES_TOTAL, "provider" => provider_name.to_owned())
                    .increment(1);
                warn!(
                    provider = provider_name,
                    attempt = attempt + 1,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after rate limit"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// ============================================================================
// RetryingCompletionProvider
// ============================================================================

/// Decorator that wraps a [`CompletionProvider`] with retry logic.
///
/// Only the initial call is retried; once a stream has been returned its
/// items pass through untouched, so partial output is never replayed.
pub struct RetryingCompletionProvider {
    inner: Arc<dyn CompletionProvider>,
    config: RetryConfig,
    retries: AtomicU64,
}

impl RetryingCompletionProvider {
    /// Wrap a completion provider with retry logic.
    pub fn new(inner: Arc<dyn CompletionProvider>, config: RetryConfig) -> Self {
        Self {
            inner,
            config,
            retries: AtomicU64::new(0),
        }
    }

    /// Total retries performed over the lifetime of this provider.
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CompletionProvider for RetryingCompletionProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<CompletionStream> {
        with_retry(
            &self.config,
            self.inner.name(),
            || {
                self.retries.fetch_add(1, Ordering::Relaxed);
            },
            || self.inner.stream(request),
        )
        .await
    }
}
