// src/server/listener.rs

//! A [`Listener`] backed by a Tokio `TcpListener`.

use super::stream::TcpConnection;
use crate::connection::{Connection, Listener};
use crate::core::events::ListenerEvents;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long the accept task pauses after a failed `accept`, e.g. on fd exhaustion.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Accepts TCP sockets on a background task and queues them until the server
/// drains the queue.
pub struct TcpAcceptQueue {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    pending: Arc<Mutex<VecDeque<(TcpStream, SocketAddr)>>>,
    read_buffer_size: usize,
    accept_task: Option<JoinHandle<()>>,
}

impl TcpAcceptQueue {
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Self::from_listener(TcpListener::bind(addr).await?)
    }

    pub fn from_listener(listener: TcpListener) -> io::Result<Self> {
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener: Some(listener),
            local_addr,
            pending: Arc::new(Mutex::new(VecDeque::new())),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            accept_task: None,
        })
    }

    /// Sets the size of each connection's socket read buffer.
    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

async fn run_accept_loop(
    listener: TcpListener,
    pending: Arc<Mutex<VecDeque<(TcpStream, SocketAddr)>>>,
    events: ListenerEvents,
) {
    loop {
        match listener.accept().await {
            Ok((socket, addr)) => {
                if events.is_closed() {
                    debug!("Event loop is gone; stopping accept loop.");
                    return;
                }
                info!("Accepted new connection from: {}", addr);
                pending.lock().push_back((socket, addr));
                events.new_connection();
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}

impl Listener for TcpAcceptQueue {
    fn subscribe(&mut self, events: ListenerEvents) {
        let Some(listener) = self.listener.take() else {
            warn!("TCP listener on {} is already subscribed.", self.local_addr);
            return;
        };
        self.accept_task = Some(tokio::spawn(run_accept_loop(
            listener,
            self.pending.clone(),
            events,
        )));
    }

    fn has_pending_connections(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    fn next_pending_connection(&mut self) -> Option<Arc<dyn Connection>> {
        let (socket, addr) = self.pending.lock().pop_front()?;
        Some(Arc::new(TcpConnection::new(
            socket,
            addr,
            self.read_buffer_size,
        )))
    }
}

impl Drop for TcpAcceptQueue {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
    }
}
