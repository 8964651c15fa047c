// tests/property/lifecycle_test.rs

//! Property-based tests for connection lifecycles: every context is evicted at
//! most once, and the registry always matches the set of live connections.

use crate::test_helpers::{Behavior, TestServer};
use proptest::prelude::*;
use spinelrpc::connection::Connection;

const CONNECTIONS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    /// Data arrives and the processor completes with the given health.
    Data(usize, bool),
    /// Data arrives and the processor keeps the callback for later.
    DataDeferred(usize),
    /// Every stored callback fires with the given health.
    FireDeferred(bool),
    /// The peer disconnects.
    Disconnect(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..CONNECTIONS, any::<bool>()).prop_map(|(i, h)| Op::Data(i, h)),
        (0..CONNECTIONS).prop_map(Op::DataDeferred),
        any::<bool>().prop_map(Op::FireDeferred),
        (0..CONNECTIONS).prop_map(Op::Disconnect),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_registry_tracks_exactly_the_live_connections(
        ops in prop::collection::vec(op_strategy(), 1..60)
    ) {
        let mut t = TestServer::new(Behavior::Healthy);
        let conns = t.accept(CONNECTIONS);
        let ids: Vec<_> = conns.iter().map(|c| c.id().unwrap()).collect();

        let mut evicted = [false; CONNECTIONS];
        // Connection index for each callback the processor is holding.
        let mut pending: Vec<usize> = Vec::new();
        let mut callbacks = Vec::new();

        for op in ops {
            match op {
                Op::Data(i, healthy) => {
                    let behavior = if healthy { Behavior::Healthy } else { Behavior::Unhealthy };
                    t.processor.set_behavior(behavior);
                    conns[i].receive(b"req");
                    t.pump();
                    if !healthy {
                        evicted[i] = true;
                    }
                }
                Op::DataDeferred(i) => {
                    t.processor.set_behavior(Behavior::Defer);
                    conns[i].receive(b"req");
                    t.pump();
                    let taken = t.processor.take_deferred();
                    if !evicted[i] {
                        prop_assert_eq!(taken.len(), 1);
                        pending.push(i);
                    } else {
                        prop_assert!(taken.is_empty(), "no dispatch after eviction");
                    }
                    callbacks.extend(taken);
                }
                Op::FireDeferred(healthy) => {
                    for cob in callbacks.drain(..) {
                        cob.call(healthy);
                    }
                    if !healthy {
                        for i in pending.drain(..) {
                            evicted[i] = true;
                        }
                    }
                    pending.clear();
                }
                Op::Disconnect(i) => {
                    conns[i].disconnect();
                    t.pump();
                    evicted[i] = true;
                }
            }

            for i in 0..CONNECTIONS {
                prop_assert_eq!(t.server.registry().contains(ids[i]), !evicted[i]);
                prop_assert_eq!(conns[i].is_open(), !evicted[i]);
                prop_assert_eq!(conns[i].close_calls(), usize::from(evicted[i]));
            }
        }
    }
}
