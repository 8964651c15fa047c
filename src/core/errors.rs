// src/core/errors.rs

//! Defines the primary error types for the entire application.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Classifies a transport failure, following the kinds RPC transports have
/// traditionally reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Unknown,
    NotOpen,
    TimedOut,
    EndOfFile,
    Interrupted,
    BadArgs,
    CorruptedData,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Unknown => "unknown",
            TransportErrorKind::NotOpen => "not open",
            TransportErrorKind::TimedOut => "timed out",
            TransportErrorKind::EndOfFile => "end of file",
            TransportErrorKind::Interrupted => "interrupted",
            TransportErrorKind::BadArgs => "bad arguments",
            TransportErrorKind::CorruptedData => "corrupted data",
        };
        f.write_str(name)
    }
}

/// A failure raised by the byte-stream layer underneath a protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transport error ({kind}): {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_open() -> Self {
        Self::new(TransportErrorKind::NotOpen, "connection is not open")
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let kind = match e.kind() {
            ErrorKind::NotConnected | ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => {
                TransportErrorKind::NotOpen
            }
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportErrorKind::TimedOut,
            ErrorKind::UnexpectedEof => TransportErrorKind::EndOfFile,
            ErrorKind::Interrupted => TransportErrorKind::Interrupted,
            ErrorKind::InvalidInput => TransportErrorKind::BadArgs,
            ErrorKind::InvalidData => TransportErrorKind::CorruptedData,
            _ => TransportErrorKind::Unknown,
        };
        TransportError::new(kind, e.to_string())
    }
}

/// The main error enum, representing all possible failures within the server.
#[derive(Error, Debug, Clone)]
pub enum SpinelRpcError {
    /// A failure of the underlying transport. Dispatch reports these separately
    /// from every other processor failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Processor error: {0}")]
    Processor(String),

    #[error("Connection limit of {0} reached")]
    ConnectionLimit(usize),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl SpinelRpcError {
    /// Returns true if this error originated in the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, SpinelRpcError::Transport(_))
    }
}

impl From<std::io::Error> for SpinelRpcError {
    fn from(e: std::io::Error) -> Self {
        SpinelRpcError::Io(Arc::new(e))
    }
}
