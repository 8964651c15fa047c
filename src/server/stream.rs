// src/server/stream.rs

//! A [`Connection`] backed by a Tokio `TcpStream`.

use crate::connection::Connection;
use crate::core::events::ConnectionEvents;
use bytes::{Buf, Bytes, BytesMut};
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A TCP socket split into a reader task and a writer task.
///
/// The reader task appends inbound bytes to a shared buffer and raises
/// "readable"; on EOF or a read error it raises "disconnected". Bytes written
/// through [`Connection::write`] are staged until [`Connection::flush`] hands them
/// to the writer task.
///
/// Must be created from within a Tokio runtime.
pub struct TcpConnection {
    peer_addr: SocketAddr,
    read_buffer_size: usize,
    open: AtomicBool,
    inbound: Arc<Mutex<BytesMut>>,
    read_half: Mutex<Option<OwnedReadHalf>>,
    staged: Mutex<BytesMut>,
    outbound: Mutex<Option<UnboundedSender<Bytes>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl TcpConnection {
    pub fn new(stream: TcpStream, peer_addr: SocketAddr, read_buffer_size: usize) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY for {}: {}", peer_addr, e);
        }
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(write_half, rx, peer_addr));

        Self {
            peer_addr,
            read_buffer_size: read_buffer_size.max(1),
            open: AtomicBool::new(true),
            inbound: Arc::new(Mutex::new(BytesMut::new())),
            read_half: Mutex::new(Some(read_half)),
            staged: Mutex::new(BytesMut::new()),
            outbound: Mutex::new(Some(tx)),
            reader: Mutex::new(None),
        }
    }
}

async fn run_reader(
    mut read_half: OwnedReadHalf,
    inbound: Arc<Mutex<BytesMut>>,
    events: ConnectionEvents,
    read_buffer_size: usize,
) {
    let mut buf = vec![0u8; read_buffer_size];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                debug!("{} closed by peer.", events.id());
                break;
            }
            Ok(n) => {
                inbound.lock().extend_from_slice(&buf[..n]);
                events.ready_read();
            }
            Err(e) => {
                warn!("Read error on {}: {}", events.id(), e);
                break;
            }
        }
    }
    events.disconnected();
}

async fn run_writer(
    mut write_half: OwnedWriteHalf,
    mut rx: UnboundedReceiver<Bytes>,
    peer_addr: SocketAddr,
) {
    while let Some(chunk) = rx.recv().await {
        if let Err(e) = write_half.write_all(&chunk).await {
            debug!("Write to {} failed: {}", peer_addr, e);
            return;
        }
    }
    // The sender is gone: the connection was closed. Everything queued before
    // that has been written.
    let _ = write_half.shutdown().await;
}

impl Connection for TcpConnection {
    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer_addr)
    }

    fn subscribe(&self, events: ConnectionEvents) {
        let Some(read_half) = self.read_half.lock().take() else {
            warn!("{} is already subscribed; ignoring.", events.id());
            return;
        };
        let handle = tokio::spawn(run_reader(
            read_half,
            self.inbound.clone(),
            events,
            self.read_buffer_size,
        ));
        *self.reader.lock() = Some(handle);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn bytes_available(&self) -> usize {
        self.inbound.lock().len()
    }

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inbound = self.inbound.lock();
        let n = buf.len().min(inbound.len());
        buf[..n].copy_from_slice(&inbound[..n]);
        inbound.advance(n);
        Ok(n)
    }

    fn write(&self, data: &[u8]) -> io::Result<usize> {
        if !self.is_open() {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection is closed",
            ));
        }
        self.staged.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&self) -> io::Result<()> {
        let chunk = self.staged.lock().split().freeze();
        if chunk.is_empty() {
            return Ok(());
        }
        let sent = match self.outbound.lock().as_ref() {
            Some(tx) => tx.send(chunk).is_ok(),
            None => false,
        };
        if sent {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "connection writer has stopped",
            ))
        }
    }

    fn close(&self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        // Dropping the sender lets the writer finish what is queued and shut down.
        self.outbound.lock().take();
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        self.read_half.lock().take();
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        self.close();
    }
}
