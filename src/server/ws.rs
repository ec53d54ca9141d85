//! One WebSocket peer of the relay.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::chat::{BroadcastEvent, ClientCommand, Connection, RelayHub};

/// Drive one peer until either side goes away.
pub async fn session(socket: WebSocket, hub: Arc<RelayHub>) {
    let connection = hub.connect().await;
    let (sender, receiver) = socket.split();
    relay(sender, receiver, &hub, connection).await;
}

/// Sends the chat snapshot first, then relays commands to the hub and hub
/// events back to the peer. Always unregisters the peer on return.
async fn relay<S, R, E>(mut sender: S, mut receiver: R, hub: &RelayHub, connection: Connection)
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let Connection { chats, mut events } = connection;

    if send(&mut sender, &BroadcastEvent::Chats { chats }).await.is_ok() {
        loop {
            tokio::select! {
                incoming = receiver.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientCommand>(text.as_str()) {
                            Ok(command) => hub.handle(command).await,
                            Err(e) => warn!(error = %e, "unreadable client command"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "websocket receive failed");
                        break;
                    }
                },
                event = events.recv() => match event {
                    Ok(event) => {
                        if send(&mut sender, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "peer lagged behind, resending snapshot");
                        let chats = hub.snapshot().await;
                        let count = hub.peers();
                        if send(&mut sender, &BroadcastEvent::Chats { chats }).await.is_err()
                            || send(&mut sender, &BroadcastEvent::UserCount { count }).await.is_err()
                        {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }

    hub.disconnect().await;
}

async fn send<S>(sender: &mut S, event: &BroadcastEvent) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let Ok(json) = serde_json::to_string(event) else {
        return Err(());
    };
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}
