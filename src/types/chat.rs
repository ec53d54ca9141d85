//! Chat thread types shared by the store and the wire protocol

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to every new chat until it is renamed or auto-titled.
pub const DEFAULT_CHAT_TITLE: &str = "New chat";

/// A conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
}

/// A message stored in a chat.
///
/// The server stamps `id` and `timestamp`; everything else the client sent
/// is kept verbatim in `body` and flattened back out on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub body: serde_json::Map<String, serde_json::Value>,
}

impl ChatMessage {
    /// The message text: `content` if present, else `result`.
    pub fn text(&self) -> &str {
        ["content", "result"]
            .iter()
            .find_map(|field| self.body.get(*field).and_then(|v| v.as_str()))
            .unwrap_or_default()
    }
}
