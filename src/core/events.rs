// src/core/events.rs

//! Defines the event bus that carries listener and connection notifications
//! to the server's event loop.

use crate::connection::ConnectionId;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// A notification for the server's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerEvent {
    /// The listener has one or more pending connections.
    NewConnections,
    /// A tracked connection has bytes available to read.
    Readable(ConnectionId),
    /// The peer of a tracked connection has disconnected.
    Disconnected(ConnectionId),
}

/// The `EventBus` queues every notification for the event loop.
///
/// Delivery is always deferred: a sink only enqueues, and the event is handled
/// on a later turn of the loop. This keeps a disconnect handler from running
/// inside the call stack of the connection that raised it.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: UnboundedSender<ServerEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` and returns the receiver for the event loop.
    pub fn new() -> (Self, UnboundedReceiver<ServerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Enqueues an event. Dropped silently if the event loop has already exited.
    pub fn publish(&self, event: ServerEvent) {
        if self.sender.send(event).is_err() {
            debug!("Dropped {:?}: the event loop is no longer running.", event);
        }
    }

    /// Returns the sink a listener uses to announce pending connections.
    pub fn listener_events(&self) -> ListenerEvents {
        ListenerEvents { bus: self.clone() }
    }

    /// Returns the sinks for the per-connection notifications of `id`.
    pub fn connection_events(&self, id: ConnectionId) -> ConnectionEvents {
        ConnectionEvents {
            id,
            bus: self.clone(),
        }
    }

    /// Checks if the event loop's receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// The "new connection(s) available" channel handed to a listener.
#[derive(Debug, Clone)]
pub struct ListenerEvents {
    bus: EventBus,
}

impl ListenerEvents {
    pub fn new_connection(&self) {
        self.bus.publish(ServerEvent::NewConnections);
    }

    /// Checks if the event loop has stopped listening.
    pub fn is_closed(&self) -> bool {
        self.bus.is_closed()
    }
}

/// The "readable" and "disconnected" channels armed for one connection.
#[derive(Debug, Clone)]
pub struct ConnectionEvents {
    id: ConnectionId,
    bus: EventBus,
}

impl ConnectionEvents {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn ready_read(&self) {
        self.bus.publish(ServerEvent::Readable(self.id));
    }

    pub fn disconnected(&self) {
        self.bus.publish(ServerEvent::Disconnected(self.id));
    }
}
