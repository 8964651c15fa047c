// src/server/reaper.rs

//! Evicts connection contexts on peer disconnect and on unhealthy completion.

use super::async_server::AsyncServer;
use crate::connection::{ConnectionContext, ConnectionId, ContextRegistry, EvictionReason};
use crate::core::processor::CompletionCallback;
use std::sync::Arc;
use tracing::warn;

impl AsyncServer {
    /// Handles a peer disconnect. An id that is no longer registered is logged and
    /// ignored.
    pub fn socket_closed(&self, id: ConnectionId) {
        if !self.registry.evict(id, EvictionReason::Disconnected) {
            warn!("Unknown connection {} closed", id);
            self.registry.record_unknown_event();
        }
    }

    /// Builds the callback a processor reports completion through.
    ///
    /// The callback owns the context it was built for, and evicts by that
    /// context's id, so a late call after the connection is gone is a no-op.
    pub(super) fn completion_callback(&self, ctx: &Arc<ConnectionContext>) -> CompletionCallback {
        let registry = self.registry.clone();
        let ctx = ctx.clone();
        CompletionCallback::new(move |healthy| finish(&registry, &ctx, healthy))
    }
}

fn finish(registry: &ContextRegistry, ctx: &ConnectionContext, healthy: bool) {
    if healthy {
        return;
    }
    warn!(
        "Processor failed to process data successfully for {}",
        ctx.id()
    );
    if !registry.evict(ctx.id(), EvictionReason::UnhealthyCompletion) {
        warn!("Completion for unknown connection {}", ctx.id());
        registry.record_unknown_event();
    }
}
