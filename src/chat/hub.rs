//! RelayHub - shared chat state plus fan-out to every connected peer

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use super::events::{BroadcastEvent, ClientCommand};
use super::store::ChatStore;
use crate::telemetry;
use crate::types::Chat;
use crate::{HuginnError, Result};

/// Default capacity of the broadcast channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Owns the chat store, the broadcast channel and the peer count.
///
/// Every mutation happens under the store lock and its event is sent before
/// the lock is released, so peers see events in mutation order.
pub struct RelayHub {
    store: Mutex<ChatStore>,
    events: broadcast::Sender<BroadcastEvent>,
    peers: AtomicUsize,
}

/// What a newly connected peer receives.
pub struct Connection {
    /// Chats at the moment of connecting, oldest first.
    pub chats: Vec<Chat>,
    /// Events broadcast after the snapshot was taken.
    pub events: broadcast::Receiver<BroadcastEvent>,
}

impl RelayHub {
    pub fn new(store: ChatStore) -> Self {
        Self::with_capacity(store, DEFAULT_BROADCAST_CAPACITY)
    }

    pub fn with_capacity(store: ChatStore, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            store: Mutex::new(store),
            events,
            peers: AtomicUsize::new(0),
        }
    }

    /// Register a peer and broadcast the new peer count.
    pub async fn connect(&self) -> Connection {
        let store = self.store.lock().await;
        let events = self.events.subscribe();
        let count = self.peers.fetch_add(1, Ordering::SeqCst) + 1;
        info!(peers = count, "peer connected");
        self.emit(BroadcastEvent::UserCount { count });
        Connection {
            chats: store.snapshot(),
            events,
        }
    }

    /// Unregister a peer and broadcast the new peer count.
    pub async fn disconnect(&self) {
        let _store = self.store.lock().await;
        let count = self
            .peers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .map_or(0, |previous| previous.saturating_sub(1));
        info!(peers = count, "peer disconnected");
        self.emit(BroadcastEvent::UserCount { count });
    }

    pub fn peers(&self) -> usize {
        self.peers.load(Ordering::SeqCst)
    }

    /// Subscribe to broadcasts without counting as a peer.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Vec<Chat> {
        self.store.lock().await.snapshot()
    }

    /// Apply one client command.
    ///
    /// Commands on a chat that does not exist are logged and dropped.
    pub async fn handle(&self, command: ClientCommand) {
        if let Err(e) = self.apply(command).await {
            match e {
                HuginnError::ChatNotFound(chat_id) => {
                    warn!(chat_id = %chat_id, "command ignored: chat not found");
                }
                other => warn!(error = %other, "command failed"),
            }
        }
    }

    async fn apply(&self, command: ClientCommand) -> Result<()> {
        let mut store = self.store.lock().await;
        match command {
            ClientCommand::CreateChat => {
                let chat = store.create_chat();
                info!(chat_id = %chat.id, "chat created");
                self.emit(BroadcastEvent::ChatCreated { chat });
            }
            ClientCommand::SwitchChat { chat_id } => {
                debug!(chat_id = %chat_id, "peer switched chat");
            }
            ClientCommand::NewMessage { chat_id, message } => {
                let kind = message
                    .get("type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("message")
                    .to_string();
                let (message, chat_title) = store.add_message(&chat_id, message)?;
                debug!(chat_id = %chat_id, kind = %kind, "message added");
                self.emit(BroadcastEvent::MessageAdded {
                    chat_id,
                    message,
                    chat_title,
                });
            }
            ClientCommand::UpdateChatTitle { chat_id, title } => {
                store.update_title(&chat_id, title.clone())?;
                info!(chat_id = %chat_id, title = %title, "chat renamed");
                self.emit(BroadcastEvent::ChatTitleUpdated { chat_id, title });
            }
            ClientCommand::DeleteChat { chat_id } => {
                store.delete_chat(&chat_id)?;
                info!(chat_id = %chat_id, "chat deleted");
                self.emit(BroadcastEvent::ChatDeleted { chat_id });
            }
        }
        Ok(())
    }

    fn emit(&self, event: BroadcastEvent) {
        metrics::counter!(telemetry::BROADCASTS_TOTAL, "event" => event.kind()).increment(1);
        // No subscribers is fine: nobody to tell.
        let _ = self.events.send(event);
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new(ChatStore::new())
    }
}
