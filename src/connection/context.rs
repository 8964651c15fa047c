// src/connection/context.rs

//! Defines `ConnectionContext`, the per-connection bundle of socket, transport
//! and protocols.

use super::handle::{Connection, ConnectionId};
use crate::core::protocol::Protocol;
use crate::core::transport::Transport;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Everything the server owns for one accepted connection.
///
/// Built once when the connection is accepted; the protocol pair is never
/// rebuilt. Shared through `Arc` so a completion callback can keep it alive
/// after the event that dispatched it has returned.
pub struct ConnectionContext {
    id: ConnectionId,
    connection: Arc<dyn Connection>,
    transport: Arc<dyn Transport>,
    input_protocol: Arc<dyn Protocol>,
    output_protocol: Arc<dyn Protocol>,
    accepted_at: Instant,
    released: AtomicBool,
}

impl ConnectionContext {
    pub fn new(
        id: ConnectionId,
        connection: Arc<dyn Connection>,
        transport: Arc<dyn Transport>,
        input_protocol: Arc<dyn Protocol>,
        output_protocol: Arc<dyn Protocol>,
    ) -> Self {
        Self {
            id,
            connection,
            transport,
            input_protocol,
            output_protocol,
            accepted_at: Instant::now(),
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn input_protocol(&self) -> &Arc<dyn Protocol> {
        &self.input_protocol
    }

    pub fn output_protocol(&self) -> &Arc<dyn Protocol> {
        &self.output_protocol
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.connection.peer_addr()
    }

    pub fn age(&self) -> Duration {
        self.accepted_at.elapsed()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Closes the transport and the socket beneath it. Only the first call has
    /// an effect.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(
            "Releasing {} after {:?}, cleaning up transport and protocols.",
            self.id,
            self.age()
        );
        self.transport.close();
        self.connection.close();
    }
}

impl Drop for ConnectionContext {
    fn drop(&mut self) {
        self.release();
    }
}
