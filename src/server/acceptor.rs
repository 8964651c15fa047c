// src/server/acceptor.rs

//! Turns pending listener connections into registered connection contexts.

use super::async_server::AsyncServer;
use crate::connection::{Connection, ConnectionContext};
use crate::core::SpinelRpcError;
use crate::core::metrics;
use std::sync::Arc;
use tracing::{info, warn};

impl AsyncServer {
    /// Drains the listener's accept queue.
    ///
    /// Every pending connection gets a transport and an input/output protocol
    /// pair. A connection whose setup fails is closed and skipped; the rest of
    /// the queue is still accepted. Returns the number of connections registered.
    pub fn process_incoming(&mut self) -> usize {
        let mut registered = 0;
        while self.listener.has_pending_connections() {
            let Some(connection) = self.listener.next_pending_connection() else {
                break;
            };

            let ctx = match self.build_context(&connection) {
                Ok(ctx) => ctx,
                Err(e) => {
                    warn!("Failed to initialize transports/protocols: {}", e);
                    metrics::CONNECTION_SETUP_FAILURES_TOTAL.inc();
                    connection.close();
                    continue;
                }
            };

            let id = ctx.id();
            self.registry.insert(ctx);
            connection.subscribe(self.bus.connection_events(id));
            metrics::CONNECTIONS_ACCEPTED_TOTAL.inc();
            match connection.peer_addr() {
                Some(addr) => info!("Registered {} from {}", id, addr),
                None => info!("Registered {}", id),
            }
            registered += 1;
        }
        registered
    }

    fn build_context(
        &mut self,
        connection: &Arc<dyn Connection>,
    ) -> Result<Arc<ConnectionContext>, SpinelRpcError> {
        if self.registry.len() >= self.max_connections {
            return Err(SpinelRpcError::ConnectionLimit(self.max_connections));
        }
        let transport = self.transport_factory.get_transport(connection)?;
        let input = self.protocol_factory.get_protocol(transport.clone())?;
        let output = self.protocol_factory.get_protocol(transport.clone())?;
        let id = self.allocate_id();
        Ok(Arc::new(ConnectionContext::new(
            id,
            connection.clone(),
            transport,
            input,
            output,
        )))
    }
}
