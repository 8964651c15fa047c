// src/server/context.rs

use super::async_server::AsyncServer;
use crate::config::Config;
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Holds all the initialized state required to run the server's main loop.
pub struct ServerContext {
    pub config: Config,
    pub server: AsyncServer,
    pub local_addr: SocketAddr,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
}
