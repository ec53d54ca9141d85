//! Public types for the Huginn API.

mod chat;
mod message;
mod request;
mod response;

pub use chat::{Chat, ChatMessage, DEFAULT_CHAT_TITLE};
pub use message::{Message, Role};
pub use request::CompletionRequest;
pub use response::{CompletionEvent, CompletionStream};
