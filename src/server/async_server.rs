// src/server/async_server.rs

//! Defines `AsyncServer`, the event loop that owns the context registry and
//! routes listener and connection events to the acceptor, dispatcher and reaper.

use crate::connection::{ConnectionId, ContextRegistry, EvictionReason, Listener};
use crate::core::events::{EventBus, ServerEvent};
use crate::core::processor::AsyncProcessor;
use crate::core::protocol::ProtocolFactory;
use crate::core::transport::{DeviceTransportFactory, TransportFactory};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

/// Accepts connections from a [`Listener`] and serves them with an
/// [`AsyncProcessor`].
///
/// All registry insertions and event handling happen on whichever task drives
/// the server; completion callbacks may evict from any task.
pub struct AsyncServer {
    pub(super) listener: Box<dyn Listener>,
    pub(super) processor: Arc<dyn AsyncProcessor>,
    pub(super) transport_factory: Arc<dyn TransportFactory>,
    pub(super) protocol_factory: Arc<dyn ProtocolFactory>,
    pub(super) registry: ContextRegistry,
    pub(super) bus: EventBus,
    events: UnboundedReceiver<ServerEvent>,
    next_id: u64,
    pub(super) max_connections: usize,
}

impl AsyncServer {
    /// Creates a server and subscribes to the listener's connection notifications.
    ///
    /// Connections are wrapped with a [`DeviceTransportFactory`] unless another is
    /// set with [`AsyncServer::with_transport_factory`].
    pub fn new(
        listener: impl Listener,
        processor: Arc<dyn AsyncProcessor>,
        protocol_factory: Arc<dyn ProtocolFactory>,
    ) -> Self {
        let (bus, events) = EventBus::new();
        let mut listener: Box<dyn Listener> = Box::new(listener);
        listener.subscribe(bus.listener_events());
        Self {
            listener,
            processor,
            transport_factory: Arc::new(DeviceTransportFactory),
            protocol_factory,
            registry: ContextRegistry::new(),
            bus,
            events,
            next_id: 0,
            max_connections: usize::MAX,
        }
    }

    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.transport_factory = factory;
        self
    }

    /// Caps the number of simultaneously registered connections. Connections
    /// accepted beyond the cap are closed.
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub(super) fn allocate_id(&mut self) -> ConnectionId {
        self.next_id += 1;
        ConnectionId::new(self.next_id)
    }

    /// Routes a single event to its handler.
    pub fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::NewConnections => {
                self.process_incoming();
            }
            ServerEvent::Readable(id) => self.begin_decode(id),
            ServerEvent::Disconnected(id) => self.socket_closed(id),
        }
    }

    /// Handles every event that is already queued, without waiting for more.
    /// Returns the number of events handled.
    pub fn run_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Waits for the next queued event.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }

    /// Drives the server until a shutdown signal arrives, then evicts every
    /// remaining connection.
    pub async fn run(&mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Server event loop received shutdown signal.");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }
        self.shutdown();
    }

    /// Evicts every tracked connection. Returns the number evicted.
    pub fn shutdown(&self) -> usize {
        let evicted = self.registry.clear(EvictionReason::Shutdown);
        if evicted > 0 {
            info!("Closed {} remaining connection(s).", evicted);
        }
        evicted
    }
}
