// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;

mod acceptor;
mod async_server;
mod connection_loop;
mod context;
mod dispatcher;
mod initialization;
mod listener;
mod metrics_server;
mod reaper;
mod spawner;
mod stream;

pub use async_server::AsyncServer;
pub use context::ServerContext;
pub use initialization::{setup, setup_with_processor};
pub use listener::TcpAcceptQueue;
pub use stream::TcpConnection;

/// The main server startup function, orchestrating all setup phases.
pub async fn run(config: Config) -> Result<()> {
    // 1. Bind the listener and build the connection manager.
    let server_context = initialization::setup(config).await?;
    serve(server_context).await
}

/// Spawns background tasks and drives an already initialized server until
/// shutdown.
pub async fn serve(mut server_context: ServerContext) -> Result<()> {
    // 2. Spawn all background tasks.
    spawner::spawn_all(&mut server_context)?;

    // 3. Start the main event loop. This function will run until shutdown.
    connection_loop::run(server_context).await
}
