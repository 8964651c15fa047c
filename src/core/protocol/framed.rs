// src/core/protocol/framed.rs

//! Implements a length-prefixed message protocol: every message is a 4-byte
//! big-endian length followed by that many payload bytes.

use super::{Protocol, ProtocolFactory};
use crate::core::errors::SpinelRpcError;
use crate::core::transport::Transport;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// The size of the scratch buffer used to drain the transport.
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// The default upper bound on a single message's payload.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

struct FramedState {
    codec: LengthDelimitedCodec,
    read_buf: BytesMut,
}

/// A protocol that frames messages with `tokio_util`'s `LengthDelimitedCodec`.
pub struct FramedProtocol {
    transport: Arc<dyn Transport>,
    state: Mutex<FramedState>,
}

impl FramedProtocol {
    pub fn new(transport: Arc<dyn Transport>, max_frame_length: usize) -> Self {
        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(max_frame_length)
            .new_codec();
        Self {
            transport,
            state: Mutex::new(FramedState {
                codec,
                read_buf: BytesMut::new(),
            }),
        }
    }

    /// Moves every byte the transport has buffered into `read_buf`.
    fn fill(&self, read_buf: &mut BytesMut) -> Result<(), SpinelRpcError> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let n = self.transport.read(&mut chunk)?;
            if n == 0 {
                return Ok(());
            }
            read_buf.extend_from_slice(&chunk[..n]);
        }
    }
}

impl Protocol for FramedProtocol {
    fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    fn read_message(&self) -> Result<Option<Bytes>, SpinelRpcError> {
        let mut guard = self.state.lock();
        let FramedState { codec, read_buf } = &mut *guard;
        self.fill(read_buf)?;
        match codec.decode(read_buf) {
            Ok(frame) => Ok(frame.map(BytesMut::freeze)),
            Err(e) => Err(SpinelRpcError::Protocol(e.to_string())),
        }
    }

    fn write_message(&self, payload: Bytes) -> Result<(), SpinelRpcError> {
        let mut out = BytesMut::with_capacity(payload.len() + 4);
        self.state
            .lock()
            .codec
            .encode(payload, &mut out)
            .map_err(|e| SpinelRpcError::Protocol(e.to_string()))?;
        self.transport.write(&out)?;
        self.transport.flush()?;
        Ok(())
    }
}

/// Builds a [`FramedProtocol`] with a fixed frame length limit.
#[derive(Debug, Clone, Copy)]
pub struct FramedProtocolFactory {
    max_frame_length: usize,
}

impl FramedProtocolFactory {
    pub fn new(max_frame_length: usize) -> Self {
        Self { max_frame_length }
    }
}

impl Default for FramedProtocolFactory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

impl ProtocolFactory for FramedProtocolFactory {
    fn get_protocol(
        &self,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<dyn Protocol>, SpinelRpcError> {
        if !transport.is_open() {
            return Err(crate::core::errors::TransportError::not_open().into());
        }
        Ok(Arc::new(FramedProtocol::new(
            transport,
            self.max_frame_length,
        )))
    }
}
