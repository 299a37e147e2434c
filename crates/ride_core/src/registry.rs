//! Live channels keyed by identity.
//!
//! At most one channel per identity. Registering again supersedes the previous
//! channel, which is told to close with [`CLOSE_SUPERSEDED`]. Unregistering is
//! conditional on the connection id, so a stale channel going away late cannot
//! evict the channel that replaced it.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::Identity;
use crate::protocol::{ServerEvent, CLOSE_SUPERSEDED};

pub type ConnectionId = Uuid;

/// Frames queued for a channel's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Event(ServerEvent),
    Close { code: u16, reason: String },
}

/// Sending half of one real-time connection.
#[derive(Debug, Clone)]
pub struct Channel {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Channel {
    /// Creates a channel with a fresh id and the receiver its transport drains.
    pub fn open() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues an event. Returns false if the transport is already gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(Outbound::Event(event)).is_ok()
    }

    pub fn close(&self, code: u16, reason: impl Into<String>) {
        let _ = self.tx.send(Outbound::Close {
            code,
            reason: reason.into(),
        });
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    channels: DashMap<Identity, Channel>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `channel` for `identity`, closing whatever channel it replaces.
    pub fn register(&self, identity: Identity, channel: Channel) {
        let connection_id = channel.id();
        if let Some(previous) = self.channels.insert(identity.clone(), channel) {
            if previous.id() != connection_id {
                info!(%identity, superseded = %previous.id(), "channel superseded");
                previous.close(CLOSE_SUPERSEDED, "superseded by a newer connection");
            }
        }
        debug!(%identity, %connection_id, "channel registered");
    }

    pub fn lookup(&self, identity: &Identity) -> Option<Channel> {
        self.channels.get(identity).map(|entry| entry.value().clone())
    }

    /// Removes the mapping only if it still points at `connection_id`.
    pub fn unregister(&self, identity: &Identity, connection_id: ConnectionId) -> bool {
        let removed = self
            .channels
            .remove_if(identity, |_, channel| channel.id() == connection_id)
            .is_some();
        debug!(%identity, %connection_id, removed, "channel unregistered");
        removed
    }

    /// Best-effort delivery. Missing or broken channels are skipped.
    pub fn send_to(&self, identity: &Identity, event: ServerEvent) -> bool {
        let Some(channel) = self.lookup(identity) else {
            debug!(%identity, "no live channel, event dropped");
            return false;
        };
        let delivered = channel.send(event);
        if !delivered {
            debug!(%identity, connection_id = %channel.id(), "channel closed, event dropped");
        }
        delivered
    }

    pub fn is_connected(&self, identity: &Identity) -> bool {
        self.lookup(identity).is_some_and(|channel| !channel.is_closed())
    }

    pub fn connection_count(&self) -> usize {
        self.channels.len()
    }
}
