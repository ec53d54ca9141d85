//! Streaming completion event types

use std::pin::Pin;

use futures_util::Stream;

use crate::Result;

/// Events emitted during a streaming completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    /// Non-empty text delta
    Content(String),

    /// Stream complete; nothing follows
    Done,
}

impl CompletionEvent {
    /// The text of a content event, if any
    pub fn as_content(&self) -> Option<&str> {
        match self {
            CompletionEvent::Content(s) => Some(s),
            CompletionEvent::Done => None,
        }
    }
}

/// Lazy, finite, non-restartable sequence of completion events.
///
/// A well-formed stream yields zero or more `Content` events and ends with
/// `Done`. A stream that yields an `Err` item is terminated by it.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<CompletionEvent>> + Send>>;
