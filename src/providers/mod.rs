//! Completion providers and provider decorators.
//!
//! [`GroqClient`] talks to the streaming completion API;
//! [`RetryingCompletionProvider`] wraps any provider with rate-limit retry.

pub mod groq;
pub mod retry;
pub mod traits;

pub use groq::{GroqClient, GroqOptions};
pub use retry::{RetryConfig, RetryingCompletionProvider};
pub use traits::CompletionProvider;
