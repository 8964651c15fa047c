// src/core/mod.rs

//! The central module containing the transport, protocol and processor
//! abstractions of SpinelRPC.

pub mod errors;
pub mod events;
pub mod metrics;
pub mod processor;
pub mod protocol;
pub mod transport;

pub use errors::{SpinelRpcError, TransportError, TransportErrorKind};
pub use events::{ConnectionEvents, EventBus, ListenerEvents, ServerEvent};
pub use processor::{AsyncProcessor, CompletionCallback};
pub use protocol::{Protocol, ProtocolFactory};
pub use transport::{Transport, TransportFactory};
