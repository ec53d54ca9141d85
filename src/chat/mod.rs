//! Multi-client chat relay: thread store, wire protocol and broadcast hub.

pub mod events;
pub mod hub;
pub mod store;

pub use events::{BroadcastEvent, ClientCommand};
pub use hub::{Connection, DEFAULT_BROADCAST_CAPACITY, RelayHub};
pub use store::{AUTO_TITLE_CHARS, ChatStore, MAX_MESSAGES_PER_CHAT};
