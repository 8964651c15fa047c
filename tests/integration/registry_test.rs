// tests/integration/registry_test.rs

use super::test_helpers::MockConnection;
use spinelrpc::connection::Connection;
use spinelrpc::core::protocol::{FramedProtocolFactory, ProtocolFactory};
use spinelrpc::core::transport::{DeviceTransportFactory, TransportFactory};
use spinelrpc::{ConnectionContext, ConnectionId, ContextRegistry, EvictionReason};
use std::sync::Arc;

fn context(id: u64) -> (Arc<ConnectionContext>, Arc<MockConnection>) {
    let mock = MockConnection::new();
    let connection: Arc<dyn Connection> = mock.clone();
    let transport = DeviceTransportFactory.get_transport(&connection).unwrap();
    let protocols = FramedProtocolFactory::default();
    let input = protocols.get_protocol(transport.clone()).unwrap();
    let output = protocols.get_protocol(transport.clone()).unwrap();
    let ctx = ConnectionContext::new(ConnectionId::new(id), connection, transport, input, output);
    (Arc::new(ctx), mock)
}

#[test]
fn test_insert_get_and_evict() {
    let registry = ContextRegistry::new();
    let (ctx, mock) = context(1);
    registry.insert(ctx.clone());

    assert_eq!(registry.len(), 1);
    let found = registry.get(ConnectionId::new(1)).expect("registered");
    assert!(Arc::ptr_eq(&found, &ctx));

    assert!(registry.evict(ConnectionId::new(1), EvictionReason::Disconnected));
    assert!(registry.is_empty());
    assert!(ctx.is_released());
    assert!(!mock.is_open());
}

#[test]
fn test_evict_absent_key_is_a_no_op() {
    let registry = ContextRegistry::new();
    let (ctx, mock) = context(7);
    registry.insert(ctx);

    assert!(!registry.evict(ConnectionId::new(8), EvictionReason::Disconnected));
    assert_eq!(registry.len(), 1);
    assert!(mock.is_open());
}

#[test]
fn test_second_eviction_of_same_key_is_a_no_op() {
    let registry = ContextRegistry::new();
    let (ctx, mock) = context(3);
    registry.insert(ctx);

    assert!(registry.evict(ConnectionId::new(3), EvictionReason::UnhealthyCompletion));
    assert!(!registry.evict(ConnectionId::new(3), EvictionReason::Disconnected));
    assert_eq!(mock.close_calls(), 1);
}

#[test]
fn test_clones_share_the_same_map() {
    let registry = ContextRegistry::new();
    let other = registry.clone();
    let (ctx, _mock) = context(5);
    registry.insert(ctx);

    assert!(other.contains(ConnectionId::new(5)));
    assert!(other.evict(ConnectionId::new(5), EvictionReason::TransportError));
    assert!(!registry.contains(ConnectionId::new(5)));
}

#[test]
fn test_dropping_last_handle_releases_context() {
    let (ctx, mock) = context(9);
    assert!(mock.is_open());
    drop(ctx);
    assert!(!mock.is_open());
}

#[test]
fn test_clear_evicts_everything() {
    let registry = ContextRegistry::new();
    let mocks: Vec<_> = (1..=3)
        .map(|i| {
            let (ctx, mock) = context(i);
            registry.insert(ctx);
            mock
        })
        .collect();

    assert_eq!(registry.clear(EvictionReason::Shutdown), 3);
    assert!(registry.is_empty());
    assert!(mocks.iter().all(|m| !m.is_open()));
}

#[test]
fn test_evictions_are_counted_per_reason_and_registry() {
    let registry = ContextRegistry::new();
    let other = ContextRegistry::new();
    for i in 1..=3 {
        registry.insert(context(i).0);
    }

    registry.evict(ConnectionId::new(1), EvictionReason::TransportError);
    registry.evict(ConnectionId::new(2), EvictionReason::ProcessorError);
    registry.evict(ConnectionId::new(2), EvictionReason::TransportError);
    registry.record_unknown_event();

    assert_eq!(registry.evictions(EvictionReason::TransportError), 1);
    assert_eq!(registry.evictions(EvictionReason::ProcessorError), 1);
    assert_eq!(registry.evictions(EvictionReason::Disconnected), 0);
    assert_eq!(registry.unknown_events(), 1);
    assert_eq!(other.evictions(EvictionReason::TransportError), 0);
    assert_eq!(other.unknown_events(), 0);
}

#[test]
fn test_registry_does_not_drive_the_connection_gauge() {
    let registry = ContextRegistry::new();
    let before = spinelrpc::core::metrics::ACTIVE_CONNECTIONS.get();
    registry.insert(context(11).0);
    registry.insert(context(12).0);
    registry.evict(ConnectionId::new(11), EvictionReason::Disconnected);

    // The gauge is set from the registry size when metrics are scraped.
    assert_eq!(spinelrpc::core::metrics::ACTIVE_CONNECTIONS.get(), before);
}
