// src/server/connection_loop.rs

//! Contains the main server loop that drives connection events and handles
//! graceful shutdown.

use super::context::ServerContext;
use anyhow::{Result, anyhow};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};

/// The main server loop. Runs until SIGINT, SIGTERM, or a failed background task.
pub async fn run(mut ctx: ServerContext) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("Failed to register SIGINT handler: {}", e))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to register SIGTERM handler: {}", e))?;

    loop {
        tokio::select! {
            biased;

            _ = sigint.recv() => {
                info!("SIGINT received, initiating graceful shutdown.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, initiating graceful shutdown.");
                break;
            }

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => { error!("CRITICAL: Background task failed: {}. Shutting down.", e); break; }
                    Err(e) => { error!("CRITICAL: Background task panicked: {e:?}. Shutting down."); break; }
                }
            },

            event = ctx.server.next_event() => match event {
                Some(event) => ctx.server.handle_event(event),
                None => {
                    error!("Server event bus closed unexpectedly. Shutting down.");
                    break;
                }
            },
        }
    }

    info!("Shutting down. Sending signal to all tasks.");
    if ctx.shutdown_tx.send(()).is_err() {
        // No background task is subscribed; nothing to notify.
        info!("No background tasks to notify.");
    }

    ctx.server.shutdown();
    info!("All client connections closed.");

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(ctx.config.shutdown_grace_period, async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
        ctx.background_tasks.shutdown().await;
    };
    info!("Server shutdown complete.");
    Ok(())
}
