//! Huginn - real-time chat relay with a queued, cached completion core
//!
//! Clients share named chat threads over a WebSocket and ask an
//! OpenAI-compatible completion API (Groq by default) for replies. Every
//! reply request goes through one [`CompletionGateway`]:
//!
//! - a TTL [`ResponseCache`] answers repeated conversations from memory
//! - a single-flight queue sends at most one request upstream at a time,
//!   in submission order
//! - a retry decorator backs off exponentially when the provider rate
//!   limits
//!
//! # Example
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use huginn::{CompletionEvent, GroqOptions, Huginn};
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let gateway = Huginn::builder()
//!         .groq(Some("gsk-your-key".into()), GroqOptions::default())
//!         .build()?;
//!
//!     let request = gateway.build_request("What is the capital of France?", &[])?;
//!     let mut events = gateway.complete(request).await?;
//!     while let Some(event) = events.next().await {
//!         match event? {
//!             CompletionEvent::Content(text) => print!("{text}"),
//!             CompletionEvent::Done => break,
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chat;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod shorten;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheConfig, ResponseCache};
pub use error::{HuginnError, Result};
pub use gateway::{CompletionGateway, GatewayStats, Huginn, HuginnBuilder};
pub use providers::{CompletionProvider, GroqClient, GroqOptions, RetryConfig};
pub use shorten::shorten;

pub use types::{
    Chat, ChatMessage, CompletionEvent, CompletionRequest, CompletionStream, Message, Role,
};

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
