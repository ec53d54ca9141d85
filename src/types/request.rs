//! Completion request and its cache fingerprint

use std::sync::Arc;

use super::message::Message;

/// An ordered, immutable sequence of conversation turns sent to the
/// completion provider.
///
/// Cloning is cheap: the turns are shared, and nothing can mutate them
/// once the request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    messages: Arc<[Message]>,
}

impl CompletionRequest {
    /// Build a request from its turns, in order.
    pub fn new(messages: impl Into<Vec<Message>>) -> Self {
        Self {
            messages: messages.into().into(),
        }
    }

    /// The turns of this request, in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Deterministic serialization of the turn sequence.
    ///
    /// Used as the response cache key: two requests with the same turns in
    /// the same order share a fingerprint.
    pub fn fingerprint(&self) -> String {
        // Serializing a slice of plain structs cannot fail.
        serde_json::to_string(self.messages()).unwrap_or_default()
    }
}
