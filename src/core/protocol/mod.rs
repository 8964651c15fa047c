// src/core/protocol/mod.rs

//! Message-level protocols layered over a [`Transport`].

pub mod framed;

pub use framed::{FramedProtocol, FramedProtocolFactory};

use crate::core::errors::SpinelRpcError;
use crate::core::transport::Transport;
use bytes::Bytes;
use std::sync::Arc;

/// A protocol instance bound to one connection's transport.
///
/// A connection owns two of these, one for input and one for output, both over
/// the same transport.
pub trait Protocol: Send + Sync {
    fn transport(&self) -> &Arc<dyn Transport>;

    /// Returns the next complete message, or `Ok(None)` if the bytes buffered so
    /// far do not yet form one.
    fn read_message(&self) -> Result<Option<Bytes>, SpinelRpcError>;

    /// Encodes `payload` as one message and flushes it to the transport.
    fn write_message(&self, payload: Bytes) -> Result<(), SpinelRpcError>;
}

/// Builds protocol instances. Called twice per accepted connection.
pub trait ProtocolFactory: Send + Sync {
    fn get_protocol(
        &self,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<dyn Protocol>, SpinelRpcError>;
}
