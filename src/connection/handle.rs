// src/connection/handle.rs

//! The interfaces a socket layer implements to be driven by the server.

use crate::core::events::{ConnectionEvents, ListenerEvents};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

/// An opaque identity for one accepted connection.
///
/// Assigned by the server in increasing order and never reissued, so a peer that
/// reconnects always gets a fresh identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// A live, accepted socket.
///
/// Reads and writes never wait: `read` returns what is already buffered and
/// `write` queues bytes for the socket's writer.
pub trait Connection: Send + Sync + 'static {
    /// The remote address, if the socket has one.
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Arms the "readable" and "disconnected" notifications for this socket.
    fn subscribe(&self, events: ConnectionEvents);

    fn is_open(&self) -> bool;

    fn bytes_available(&self) -> usize;

    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&self, data: &[u8]) -> io::Result<usize>;

    fn flush(&self) -> io::Result<()>;

    /// Closes the socket. Idempotent.
    fn close(&self);
}

/// A source of accepted connections.
pub trait Listener: Send + 'static {
    /// Arms the "new connection(s) available" notification.
    fn subscribe(&mut self, events: ListenerEvents);

    fn has_pending_connections(&self) -> bool;

    /// Takes the next connection off the accept queue.
    fn next_pending_connection(&mut self) -> Option<Arc<dyn Connection>>;
}
