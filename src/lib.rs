// src/lib.rs

pub mod config;
pub mod connection;
pub mod core;
pub mod server;

// Re-export
pub use crate::connection::{ConnectionContext, ConnectionId, ContextRegistry, EvictionReason};
pub use crate::core::SpinelRpcError;
pub use crate::server::AsyncServer;
