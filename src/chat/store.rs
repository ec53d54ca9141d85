//! In-memory chat threads.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::types::{Chat, ChatMessage, DEFAULT_CHAT_TITLE};
use crate::{HuginnError, Result};

/// Messages kept per chat; older ones are dropped first.
pub const MAX_MESSAGES_PER_CHAT: usize = 50;

/// Characters of the first message used as an automatic title.
pub const AUTO_TITLE_CHARS: usize = 30;

/// Mapping from chat id to thread state.
///
/// Not synchronized; the relay hub wraps it in a mutex.
#[derive(Debug)]
pub struct ChatStore {
    chats: HashMap<String, Chat>,
}

impl ChatStore {
    /// Create a store holding one empty default chat.
    pub fn new() -> Self {
        let mut store = Self::empty();
        store.create_chat();
        store
    }

    /// Create a store with no chats at all.
    pub fn empty() -> Self {
        Self {
            chats: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn get(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.get(chat_id)
    }

    /// Add a new empty chat and return a copy of it.
    pub fn create_chat(&mut self) -> Chat {
        let chat = Chat {
            id: format!("chat-{}", Uuid::new_v4().simple()),
            title: DEFAULT_CHAT_TITLE.to_string(),
            created_at: Utc::now(),
            messages: Vec::new(),
        };
        self.chats.insert(chat.id.clone(), chat.clone());
        chat
    }

    /// Append a client message to a chat.
    ///
    /// Returns the stamped message and the chat title after the append.
    pub fn add_message(
        &mut self,
        chat_id: &str,
        body: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(ChatMessage, String)> {
        let chat = self.get_mut(chat_id)?;

        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            body,
        };
        chat.messages.push(message.clone());
        if chat.messages.len() > MAX_MESSAGES_PER_CHAT {
            let excess = chat.messages.len() - MAX_MESSAGES_PER_CHAT;
            chat.messages.drain(..excess);
        }

        if chat.messages.len() == 1 && chat.title == DEFAULT_CHAT_TITLE {
            chat.title = auto_title(message.text());
        }

        Ok((message, chat.title.clone()))
    }

    pub fn update_title(&mut self, chat_id: &str, title: impl Into<String>) -> Result<()> {
        self.get_mut(chat_id)?.title = title.into();
        Ok(())
    }

    pub fn delete_chat(&mut self, chat_id: &str) -> Result<Chat> {
        self.chats
            .remove(chat_id)
            .ok_or_else(|| HuginnError::ChatNotFound(chat_id.to_string()))
    }

    /// All chats, oldest first.
    pub fn snapshot(&self) -> Vec<Chat> {
        let mut chats: Vec<Chat> = self.chats.values().cloned().collect();
        chats.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        chats
    }

    fn get_mut(&mut self, chat_id: &str) -> Result<&mut Chat> {
        self.chats
            .get_mut(chat_id)
            .ok_or_else(|| HuginnError::ChatNotFound(chat_id.to_string()))
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}

fn auto_title(text: &str) -> String {
    if text.chars().count() > AUTO_TITLE_CHARS {
        let mut title: String = text.chars().take(AUTO_TITLE_CHARS).collect();
        title.push_str("...");
        title
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn new_store_has_default_chat() {
        let store = ChatStore::new();
        let chats = store.snapshot();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].title, DEFAULT_CHAT_TITLE);
        assert!(chats[0].id.starts_with("chat-"));
    }

    #[test]
    fn auto_title_short_text_kept_whole() {
        assert_eq!(auto_title("hello"), "hello");
        assert_eq!(auto_title(&"a".repeat(30)), "a".repeat(30));
    }

    #[test]
    fn auto_title_counts_characters() {
        let text = "привет ".repeat(10);
        let title = auto_title(&text);
        assert_eq!(title.chars().count(), 33);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn missing_chat_is_not_found() {
        let mut store = ChatStore::empty();
        let err = store.add_message("chat-x", body(json!({}))).unwrap_err();
        assert!(matches!(err, HuginnError::ChatNotFound(id) if id == "chat-x"));
        assert!(store.update_title("chat-x", "t").is_err());
        assert!(store.delete_chat("chat-x").is_err());
    }
}
