//! Response cache for completed completions.
//!
//! [`ResponseCache`] maps a request fingerprint (see
//! [`CompletionRequest::fingerprint`](crate::CompletionRequest::fingerprint))
//! to the full text of a finished completion. Identical turn sequences
//! asked again within the TTL are answered from memory and never reach the
//! queue or the provider.
//!
//! # Expiry
//!
//! Entries expire `ttl` after their last `store`. An expired entry is
//! never returned; moka drops it lazily rather than on a sweep. By
//! default there is no size bound, so memory grows with the number of
//! distinct fingerprints seen within one TTL window.

use std::time::Duration;

use moka::future::Cache;

use crate::telemetry;

/// Configuration for the response cache.
///
/// ```rust
/// # use huginn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .ttl(Duration::from_secs(60))
///     .max_entries(10_000);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for cached entries. Default: 5 minutes.
    pub ttl: Duration,
    /// Optional bound on the number of entries. Default: unbounded.
    pub max_entries: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            max_entries: None,
        }
    }
}

impl CacheConfig {
    /// Create a new config with the default TTL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Bound the number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = Some(n);
        self
    }
}

/// In-memory TTL cache of completed response texts.
pub struct ResponseCache {
    cache: Cache<String, String>,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let mut builder = Cache::builder().time_to_live(config.ttl);
        if let Some(max) = config.max_entries {
            builder = builder.max_capacity(max);
        }
        Self {
            cache: builder.build(),
        }
    }

    /// Look up a cached response.
    ///
    /// Returns `None` on a miss, including when the entry exists but has
    /// outlived the TTL. Emits cache hit/miss metrics.
    pub async fn lookup(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Some(text) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(text)
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Store a response, replacing any existing entry and restarting its TTL.
    pub async fn store(&self, key: impl Into<String>, text: impl Into<String>) {
        self.cache.insert(key.into(), text.into()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_five_minutes() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert!(config.max_entries.is_none());
    }

    #[tokio::test]
    async fn store_overwrites() {
        let cache = ResponseCache::new(&CacheConfig::default());
        cache.store("k", "first").await;
        cache.store("k", "second").await;
        assert_eq!(cache.lookup("k").await.as_deref(), Some("second"));
    }
}
