//! Builder for configuring gateway instances

use std::sync::Arc;
use std::time::Duration;

use super::CompletionGateway;
use super::queue::{DEFAULT_PACING, SingleFlightQueue};
use crate::cache::{CacheConfig, ResponseCache};
use crate::providers::{
    CompletionProvider, GroqClient, GroqOptions, RetryConfig, RetryingCompletionProvider,
};
use crate::{HuginnError, Result};

/// System prompt sent ahead of every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a smart AI assistant. Answer briefly, clearly \
and to the point, without filler. Use markdown for code and lists. Be as specific and helpful \
as possible.";

/// Number of prior turns kept as context for a new message.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Main entry point for creating gateway instances.
pub struct Huginn;

impl Huginn {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }
}

/// Builder for configuring gateway instances.
pub struct HuginnBuilder {
    provider: Option<Arc<dyn CompletionProvider>>,
    groq: Option<(Option<String>, GroqOptions)>,
    retry: RetryConfig,
    cache: CacheConfig,
    pacing: Duration,
    system_prompt: String,
    history_limit: usize,
}

impl HuginnBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            groq: None,
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            pacing: DEFAULT_PACING,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Use the Groq completion API. A missing key is accepted; requests
    /// then fail with [`HuginnError::MissingApiKey`].
    pub fn groq(mut self, api_key: Option<String>, options: GroqOptions) -> Self {
        self.groq = Some((api_key, options));
        self
    }

    /// Use a custom completion provider (takes precedence over `groq`).
    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the retry policy applied to call establishment.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Set the response cache configuration.
    pub fn response_cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Set the pause between consecutive queue entries.
    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Replace the system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set how many prior turns are forwarded as context.
    pub fn history_limit(mut self, turns: usize) -> Self {
        self.history_limit = turns;
        self
    }

    /// Build the gateway and start its queue worker.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn build(self) -> Result<CompletionGateway> {
        let inner: Arc<dyn CompletionProvider> = match (self.provider, self.groq) {
            (Some(provider), _) => provider,
            (None, Some((api_key, options))) => Arc::new(GroqClient::new(api_key, options)?),
            (None, None) => {
                return Err(HuginnError::Configuration(
                    "no completion provider configured".to_string(),
                ));
            }
        };

        let retrying = Arc::new(RetryingCompletionProvider::new(inner, self.retry));
        let cache = Arc::new(ResponseCache::new(&self.cache));
        let queue = SingleFlightQueue::spawn(retrying.clone(), Some(cache.clone()), self.pacing);

        Ok(CompletionGateway::new(
            cache,
            queue,
            retrying,
            self.system_prompt,
            self.history_limit,
        ))
    }
}

impl Default for HuginnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
