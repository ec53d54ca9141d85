//! Relay wire protocol.
//!
//! Both directions are JSON objects tagged by `type`. Field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::types::{Chat, ChatMessage};

/// A command sent by a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    CreateChat,
    #[serde(rename_all = "camelCase")]
    SwitchChat { chat_id: String },
    #[serde(alias = "add-message", rename_all = "camelCase")]
    NewMessage {
        chat_id: String,
        message: serde_json::Map<String, serde_json::Value>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateChatTitle { chat_id: String, title: String },
    #[serde(rename_all = "camelCase")]
    DeleteChat { chat_id: String },
}

/// An event pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BroadcastEvent {
    /// Full snapshot, sent only to the client that just connected.
    Chats { chats: Vec<Chat> },
    ChatCreated { chat: Chat },
    #[serde(rename_all = "camelCase")]
    MessageAdded {
        chat_id: String,
        message: ChatMessage,
        chat_title: String,
    },
    #[serde(rename_all = "camelCase")]
    ChatTitleUpdated { chat_id: String, title: String },
    #[serde(rename_all = "camelCase")]
    ChatDeleted { chat_id: String },
    UserCount { count: usize },
}

impl BroadcastEvent {
    /// Wire name of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chats { .. } => "chats",
            Self::ChatCreated { .. } => "chat-created",
            Self::MessageAdded { .. } => "message-added",
            Self::ChatTitleUpdated { .. } => "chat-title-updated",
            Self::ChatDeleted { .. } => "chat-deleted",
            Self::UserCount { .. } => "user-count",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_create_chat() {
        let cmd: ClientCommand = serde_json::from_value(json!({"type": "create-chat"})).unwrap();
        assert_eq!(cmd, ClientCommand::CreateChat);
    }

    #[test]
    fn add_message_is_alias_for_new_message() {
        let raw = json!({
            "type": "add-message",
            "chatId": "chat-1",
            "message": {"role": "user", "content": "hi"}
        });
        let cmd: ClientCommand = serde_json::from_value(raw).unwrap();
        match cmd {
            ClientCommand::NewMessage { chat_id, message } => {
                assert_eq!(chat_id, "chat-1");
                assert_eq!(message["content"], "hi");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_command_is_rejected() {
        let result = serde_json::from_value::<ClientCommand>(json!({"type": "explode"}));
        assert!(result.is_err());
    }

    #[test]
    fn events_use_camel_case_fields() {
        let event = BroadcastEvent::ChatTitleUpdated {
            chat_id: "chat-1".into(),
            title: "Rust".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "chat-title-updated", "chatId": "chat-1", "title": "Rust"})
        );
        assert_eq!(event.kind(), "chat-title-updated");
    }

    #[test]
    fn user_count_shape() {
        let value = serde_json::to_value(BroadcastEvent::UserCount { count: 3 }).unwrap();
        assert_eq!(value, json!({"type": "user-count", "count": 3}));
    }
}
