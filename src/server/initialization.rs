// src/server/initialization.rs

//! Handles server initialization: binding the listener and wiring the
//! processor, protocol factory and connection limits into an `AsyncServer`.

use super::async_server::AsyncServer;
use super::context::ServerContext;
use super::listener::TcpAcceptQueue;
use crate::config::Config;
use crate::core::processor::{AsyncProcessor, EchoProcessor};
use crate::core::protocol::FramedProtocolFactory;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::info;

/// Initializes all server components before starting the main loop, serving
/// connections with the built-in echo processor.
pub async fn setup(config: Config) -> Result<ServerContext> {
    setup_with_processor(config, Arc::new(EchoProcessor)).await
}

/// Initializes all server components around a caller-supplied processor.
pub async fn setup_with_processor(
    config: Config,
    processor: Arc<dyn AsyncProcessor>,
) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    let listener = TcpAcceptQueue::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?
        .with_read_buffer_size(config.read_buffer_size);
    let local_addr = listener.local_addr();
    info!("SpinelRPC server listening on {}", local_addr);

    let protocol_factory = Arc::new(FramedProtocolFactory::new(config.max_frame_length));
    let server = AsyncServer::new(listener, processor, protocol_factory)
        .with_max_connections(config.max_connections);

    Ok(ServerContext {
        config,
        server,
        local_addr,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}

fn log_startup_info(config: &Config) {
    info!(
        "Connection limit set to {}, max frame length {} bytes ({:.2} MB).",
        config.max_connections,
        config.max_frame_length,
        config.max_frame_length as f64 / 1024.0 / 1024.0
    );
    info!("Socket read buffer size: {} bytes.", config.read_buffer_size);
}
