// src/server/dispatcher.rs

//! Hands readable connections to the processor.

use super::async_server::AsyncServer;
use crate::connection::{ConnectionId, EvictionReason};
use crate::core::SpinelRpcError;
use crate::core::metrics;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

impl AsyncServer {
    /// Runs the processor for a connection that has data available.
    ///
    /// An id that is no longer registered is logged and ignored; data can race
    /// with eviction. A failure raised by the processor call itself evicts the
    /// connection, with transport failures reported separately.
    pub fn begin_decode(&self, id: ConnectionId) {
        let Some(ctx) = self.registry.get(id) else {
            warn!("Got data on an unknown connection {}", id);
            self.registry.record_unknown_event();
            return;
        };

        metrics::DISPATCHES_TOTAL.inc();
        debug!(
            "Dispatching {} ({} byte(s) buffered).",
            id,
            ctx.transport().bytes_available()
        );

        let cob = self.completion_callback(&ctx);
        let input = ctx.input_protocol().clone();
        let output = ctx.output_protocol().clone();
        let processor = &self.processor;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            processor.process(cob, input, output)
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(SpinelRpcError::Transport(e))) => {
                warn!("Transport error during processing of {}: '{}'", id, e);
                self.registry.evict(id, EvictionReason::TransportError);
            }
            Ok(Err(e)) => {
                warn!("Processor error for {}: {}", id, e);
                self.registry.evict(id, EvictionReason::ProcessorError);
            }
            Err(_) => {
                warn!("Unknown processor exception: processor panicked while handling {}", id);
                self.registry.evict(id, EvictionReason::ProcessorError);
            }
        }
    }
}
