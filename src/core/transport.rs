// src/core/transport.rs

//! The byte-stream layer between a live connection and its protocols.

use crate::connection::Connection;
use crate::core::errors::{SpinelRpcError, TransportError, TransportErrorKind};
use std::sync::Arc;

/// A byte stream layered over a connection.
///
/// One transport is shared by the input and the output protocol of a
/// connection, so every method takes `&self`.
pub trait Transport: Send + Sync {
    fn is_open(&self) -> bool;

    /// Number of bytes that can be read without waiting for the peer.
    fn bytes_available(&self) -> usize;

    /// Reads buffered bytes into `buf`. Returns `Ok(0)` when nothing is buffered.
    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Writes the entirety of `buf`.
    fn write(&self, buf: &[u8]) -> Result<(), TransportError>;

    fn flush(&self) -> Result<(), TransportError>;

    /// Closes the transport and the connection beneath it. Idempotent.
    fn close(&self);
}

/// Builds the transport for a newly accepted connection.
pub trait TransportFactory: Send + Sync {
    fn get_transport(
        &self,
        connection: &Arc<dyn Connection>,
    ) -> Result<Arc<dyn Transport>, SpinelRpcError>;
}

/// A transport that reads and writes a [`Connection`] directly.
pub struct DeviceTransport {
    connection: Arc<dyn Connection>,
}

impl DeviceTransport {
    pub fn new(connection: Arc<dyn Connection>) -> Result<Self, TransportError> {
        if !connection.is_open() {
            return Err(TransportError::new(
                TransportErrorKind::NotOpen,
                "connection was closed before a transport could be created",
            ));
        }
        Ok(Self { connection })
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.connection.is_open() {
            Ok(())
        } else {
            Err(TransportError::not_open())
        }
    }
}

impl Transport for DeviceTransport {
    fn is_open(&self) -> bool {
        self.connection.is_open()
    }

    fn bytes_available(&self) -> usize {
        self.connection.bytes_available()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.ensure_open()?;
        Ok(self.connection.read(buf)?)
    }

    fn write(&self, buf: &[u8]) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut written = 0;
        while written < buf.len() {
            let n = self.connection.write(&buf[written..])?;
            if n == 0 {
                return Err(TransportError::new(
                    TransportErrorKind::Unknown,
                    format!(
                        "connection accepted no bytes after {written} of {}",
                        buf.len()
                    ),
                ));
            }
            written += n;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        self.ensure_open()?;
        Ok(self.connection.flush()?)
    }

    fn close(&self) {
        self.connection.close();
    }
}

/// The default [`TransportFactory`], producing a [`DeviceTransport`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceTransportFactory;

impl TransportFactory for DeviceTransportFactory {
    fn get_transport(
        &self,
        connection: &Arc<dyn Connection>,
    ) -> Result<Arc<dyn Transport>, SpinelRpcError> {
        Ok(Arc::new(DeviceTransport::new(connection.clone())?))
    }
}
