// src/connection/registry.rs

//! Defines `ContextRegistry`, the map of every connection the server tracks.

use super::context::ConnectionContext;
use super::handle::ConnectionId;
use crate::core::metrics;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Why a context left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// The peer disconnected.
    Disconnected,
    /// The processor raised a transport failure while dispatching.
    TransportError,
    /// The processor raised any other failure while dispatching.
    ProcessorError,
    /// The processor reported an unhealthy completion.
    UnhealthyCompletion,
    /// The server is shutting down.
    Shutdown,
}

impl EvictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::Disconnected => "disconnected",
            EvictionReason::TransportError => "transport_error",
            EvictionReason::ProcessorError => "processor_error",
            EvictionReason::UnhealthyCompletion => "unhealthy_completion",
            EvictionReason::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const REASON_COUNT: usize = 5;

/// Per-registry totals, kept alongside the process-wide Prometheus counters.
#[derive(Default)]
struct RegistryStats {
    evictions: [AtomicU64; REASON_COUNT],
    unknown_events: AtomicU64,
}

/// The single source of truth for which connections are currently tracked.
///
/// A key is present iff its connection was set up successfully and has not been
/// evicted. A missing key is an ordinary condition: the connection is unknown or
/// already closed. Cloning yields another handle to the same map.
#[derive(Clone, Default)]
pub struct ContextRegistry {
    contexts: Arc<DashMap<ConnectionId, Arc<ConnectionContext>>>,
    stats: Arc<RegistryStats>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly built context under its own id.
    pub fn insert(&self, ctx: Arc<ConnectionContext>) {
        let id = ctx.id();
        if let Some(previous) = self.contexts.insert(id, ctx) {
            // Ids are never reissued, so this only happens on a caller bug.
            warn!("Replaced a live context for {}; releasing the old one.", id);
            previous.release();
        }
    }

    /// Returns a shared handle to the context for `id`, if tracked.
    ///
    /// The map guard is dropped before returning, so the caller may hold the
    /// context across calls that themselves evict.
    pub fn get(&self, id: ConnectionId) -> Option<Arc<ConnectionContext>> {
        self.contexts.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.contexts.contains_key(&id)
    }

    /// Removes and releases the context for `id`.
    ///
    /// Returns `false` without side effects if `id` is not tracked, which makes
    /// concurrent eviction triggers for the same connection safe: exactly one of
    /// them performs the removal.
    pub fn evict(&self, id: ConnectionId, reason: EvictionReason) -> bool {
        let Some((_, ctx)) = self.contexts.remove(&id) else {
            return false;
        };
        self.stats.evictions[reason as usize].fetch_add(1, Ordering::Relaxed);
        metrics::EVICTIONS_TOTAL
            .with_label_values(&[reason.as_str()])
            .inc();
        debug!("Evicted {} ({}).", id, reason);
        ctx.release();
        true
    }

    /// Evicts every tracked context. Returns the number evicted.
    pub fn clear(&self, reason: EvictionReason) -> usize {
        self.ids()
            .into_iter()
            .filter(|id| self.evict(*id, reason))
            .count()
    }

    /// The number of contexts this registry has evicted for `reason`.
    pub fn evictions(&self, reason: EvictionReason) -> u64 {
        self.stats.evictions[reason as usize].load(Ordering::Relaxed)
    }

    /// Counts an event that named a connection this registry does not track.
    pub fn record_unknown_event(&self) {
        self.stats.unknown_events.fetch_add(1, Ordering::Relaxed);
        metrics::UNKNOWN_CONNECTION_EVENTS_TOTAL.inc();
    }

    /// The number of events seen for connections that were not tracked.
    pub fn unknown_events(&self) -> u64 {
        self.stats.unknown_events.load(Ordering::Relaxed)
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        self.contexts.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

impl fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRegistry")
            .field("len", &self.len())
            .field("unknown_events", &self.unknown_events())
            .finish()
    }
}
