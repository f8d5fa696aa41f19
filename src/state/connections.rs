//! Connection registry: transport identifiers, per-connection outbound
//! channels, and named broadcast channels keyed by room code.

use std::collections::HashSet;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::dto::ws::ServerMessage;

/// Unique identifier assigned to each WebSocket connection.
pub type ConnectionId = Uuid;

#[derive(Clone)]
/// Handle used to push messages to a connected client.
pub struct ConnectionHandle {
    /// The connection's identifier.
    pub id: ConnectionId,
    /// Sender feeding the connection's dedicated writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Registry of live connections and their channel memberships. This is the
/// only resource shared across rooms; it is fan-out only, so no room can read
/// another room's data through it.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionHandle>,
    channels: DashMap<String, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection.
    pub fn register(&self, id: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.connections.insert(id, ConnectionHandle { id, tx });
    }

    /// Forget a connection. Channel membership is cleaned up separately when
    /// the connection leaves its room.
    pub fn unregister(&self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    /// Add a connection to a named channel.
    pub fn join_channel(&self, channel: &str, id: ConnectionId) {
        self.channels.entry(channel.to_string()).or_default().insert(id);
    }

    /// Remove a connection from a named channel.
    pub fn leave_channel(&self, channel: &str, id: ConnectionId) {
        if let Some(mut members) = self.channels.get_mut(channel) {
            members.remove(&id);
        }
    }

    /// Drop a channel and all its memberships.
    pub fn drop_channel(&self, channel: &str) {
        self.channels.remove(channel);
    }

    /// Send a message to a single connection. Unknown or closed connections
    /// are ignored; disconnect cleanup races are resolved by the reader task.
    pub fn send(&self, id: ConnectionId, message: &ServerMessage) {
        let Some(text) = encode(message) else { return };
        if let Some(handle) = self.connections.get(&id) {
            let _ = handle.tx.send(Message::Text(text.into()));
        }
    }

    /// Deliver a message to every connection in a channel. The payload is
    /// serialized once and fanned out.
    pub fn broadcast(&self, channel: &str, message: &ServerMessage) {
        let Some(text) = encode(message) else { return };
        let Some(members) = self.channels.get(channel) else {
            return;
        };
        for id in members.iter() {
            if let Some(handle) = self.connections.get(id) {
                let _ = handle.tx.send(Message::Text(text.clone().into()));
            }
        }
    }
}

/// Serialize an outbound message, logging instead of failing: a serialization
/// error is a bug in our own types, not a recoverable condition.
fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(error = %err, "failed to serialize outbound message `{message:?}`");
            None
        }
    }
}
