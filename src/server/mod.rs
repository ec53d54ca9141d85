//! HTTP and WebSocket surface of the relay.
//!
//! - `POST /api/chat` streams a completion as server-sent events
//! - `POST /api/fetch-url` returns the readable text of a page
//! - `POST /api/shorten` shortens text to a preview
//! - `GET /api/stats` and `GET /health`
//! - `GET /ws` carries the chat relay protocol (see [`crate::chat::events`])

pub mod config;
mod error;
mod routes;
mod ws;

pub use error::{ApiError, ErrorBody};
pub use routes::{AppState, router};
