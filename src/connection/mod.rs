// src/connection/mod.rs

//! Per-connection state: the connection handle interfaces, the context bundled
//! for every accepted connection, and the registry that tracks them.

mod context;
mod handle;
mod registry;

pub use context::ConnectionContext;
pub use handle::{Connection, ConnectionId, Listener};
pub use registry::{ContextRegistry, EvictionReason};
