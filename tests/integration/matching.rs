use std::sync::Arc;

use berth_routing::{ByteMatcher, MatchOutcome};

use crate::*;

/// Header recognition over the first twenty bytes.
#[test]
fn test_prefix_recognition() {
    let engine = TestEngine::new();
    let matcher = engine.registry.byte_matcher();

    assert_eq!(matcher.min_bytes(), 20);
    assert_eq!(matcher.max_bytes(), 48);
    assert_eq!(matcher.specific_port(), None);

    let prefix = handshake_prefix(hash(1));
    assert!(matcher.match_prefix(&prefix[..20]));
    assert!(matcher.match_prefix(&prefix));
    assert!(!matcher.match_prefix(&prefix[..19]));
    assert!(!matcher.match_prefix(b"HTTP/1.1 200 OK\r\n\r\nxx"));
}

/// A recognized header without the full prefix asks the caller to keep
/// buffering.
#[test]
fn test_partial_when_header_only() {
    let engine = TestEngine::new();
    engine.registry.register(hash(1), FakeAdapter::new());
    let matcher = engine.registry.byte_matcher();

    let conn = FakeConnection::new(peer(1, 6881));
    let record = conn.record();
    let prefix = handshake_prefix(hash(1));

    let outcome = matcher.match_full(&conn, &prefix[..20]);
    assert!(matches!(outcome, MatchOutcome::Partial));
    assert!(!record.is_closed());
}

/// A hash nobody registered is no match, and the connection is left
/// untouched for other matchers.
#[test]
fn test_unknown_hash_no_match() {
    let engine = TestEngine::new();
    engine.registry.register(hash(1), FakeAdapter::new());
    let matcher = engine.registry.byte_matcher();

    let conn = FakeConnection::new(peer(1, 6881));
    let record = conn.record();

    let outcome = matcher.match_full(&conn, &handshake_prefix(hash(2)));
    assert!(matches!(outcome, MatchOutcome::NoMatch));
    assert!(!record.is_closed());
}

/// An inactive swarm admits through the adapter's activation policy.
#[test]
fn test_full_match_consults_adapter() {
    let engine = TestEngine::new();
    let adapter = FakeAdapter::new();
    let registration = engine.registry.register(hash(1), adapter.clone());
    let matcher = engine.registry.byte_matcher();

    let remote = peer(1, 6881);
    let conn = FakeConnection::new(remote.clone());
    let outcome = matcher.match_full(&conn, &handshake_prefix(hash(1)));
    assert!(outcome.matched());

    let matched = match outcome {
        MatchOutcome::Matched(matched) => matched,
        other => panic!("expected a match, got {other:?}"),
    };
    assert!(Arc::ptr_eq(&matched, &registration));
    assert_eq!(*adapter.activate_requests.lock().unwrap(), [remote]);
}

/// An active swarm admits without asking the adapter.
#[test]
fn test_active_swarm_admits_unconditionally() {
    let engine = TestEngine::new();
    let adapter = FakeAdapter::new();
    let registration = engine.registry.register(hash(1), adapter.clone());
    registration.activate(FakeController::new("alpha"));
    adapter.deny_activation();

    let matcher = engine.registry.byte_matcher();
    let conn = FakeConnection::new(peer(1, 6881));
    let outcome = matcher.match_full(&conn, &handshake_prefix(hash(1)));
    assert!(outcome.matched());
    assert_eq!(adapter.activate_request_count(), 0);
}

/// An adapter refusal closes the connection at the matcher.
#[test]
fn test_denied_by_rules_closes() {
    let engine = TestEngine::new();
    let adapter = FakeAdapter::new();
    engine.registry.register(hash(1), adapter.clone());
    adapter.deny_activation();

    let matcher = engine.registry.byte_matcher();
    let conn = FakeConnection::new(peer(1, 6881));
    let record = conn.record();

    let outcome = matcher.match_full(&conn, &handshake_prefix(hash(1)));
    assert!(matches!(outcome, MatchOutcome::NoMatch));
    assert_eq!(record.close_reason().as_deref(), Some("denied by rules"));
}

/// The full known-seed cycle: a replayed peer that leaves as a seed gets
/// the session wound down and is refused on reconnect, from any port.
#[test]
fn test_known_seed_reconnect_denied() {
    let engine = TestEngine::new();
    let adapter = FakeAdapter::new();
    let registration = engine.registry.register(hash(1), adapter.clone());
    let matcher = engine.registry.byte_matcher();
    let prefix = handshake_prefix(hash(1));

    // First visit: admitted, queued, replayed by activation.
    let remote = peer(9, 50_000);
    let conn = FakeConnection::new(remote.clone());
    let outcome = matcher.match_full(&conn, &prefix);
    assert!(outcome.matched());
    registration.route(conn.boxed(), None);
    registration.activate(FakeController::new("alpha"));

    let transport = engine.factory.transport(0);
    assert!(transport.is_started());
    assert_eq!(transport.observer_count(), 1);

    // The peer turns out to be a seed and disconnects.
    transport.set_seed(true);
    transport.simulate_closing();
    assert_eq!(*adapter.deactivate_requests.lock().unwrap(), [remote]);

    // The owner obliges and winds the session down.
    registration.deactivate();

    // Reconnect from the same host on a fresh port: refused as known seed,
    // without consulting the adapter again.
    let requests_before = adapter.activate_request_count();
    let retry = FakeConnection::new(peer(9, 60_000));
    let retry_record = retry.record();
    let outcome = matcher.match_full(&retry, &prefix);
    assert!(matches!(outcome, MatchOutcome::NoMatch));
    assert_eq!(
        retry_record.close_reason().as_deref(),
        Some("denied as known seed")
    );
    assert_eq!(adapter.activate_request_count(), requests_before);
}

/// Known-seed denial refuses only the seed: connections already queued
/// stay queued and drain in order on the next activation.
#[test]
fn test_seed_denial_leaves_queue_intact() {
    let engine = TestEngine::new();
    let adapter = FakeAdapter::new();
    let registration = engine.registry.register(hash(1), adapter.clone());
    let matcher = engine.registry.byte_matcher();
    let prefix = handshake_prefix(hash(1));

    // Teach the swarm one seed: routed, replayed, closing as a seed.
    registration.route(FakeConnection::new(peer(9, 50_000)).boxed(), None);
    registration.activate(FakeController::new("alpha"));
    let transport = engine.factory.transport(0);
    transport.set_seed(true);
    transport.simulate_closing();
    registration.deactivate();

    // Two fresh peers queue up while the swarm is down again.
    let c1 = peer(1, 6881);
    let c2 = peer(2, 6881);
    for remote in [&c1, &c2] {
        let conn = FakeConnection::new(remote.clone());
        assert!(matcher.match_full(&conn, &prefix).matched());
        registration.route(conn.boxed(), None);
    }

    // The seed comes back: denied at match, the queue is not disturbed.
    let retry = FakeConnection::new(peer(9, 60_000));
    let outcome = matcher.match_full(&retry, &prefix);
    assert!(matches!(outcome, MatchOutcome::NoMatch));

    let controller = FakeController::new("beta");
    registration.activate(controller.clone());
    assert_eq!(controller.received_count(), 2);
    // Transport zero went to the seed; the drained pair follows in order.
    assert_eq!(engine.factory.created_remotes()[1..], [c1, c2]);
}

/// Only replayed connections get the seed observer; fresh dispatches to an
/// active swarm do not.
#[test]
fn test_observer_only_on_replay() {
    let engine = TestEngine::new();
    let registration = engine.registry.register(hash(1), FakeAdapter::new());
    registration.activate(FakeController::new("alpha"));

    registration.route(FakeConnection::new(peer(1, 6881)).boxed(), None);
    assert_eq!(engine.factory.transport(0).observer_count(), 0);
}

/// Manual hash matching applies the same admission policy, sans transport.
#[test]
fn test_match_hash_manual() {
    let engine = TestEngine::new();
    let adapter = FakeAdapter::new();
    let registration = engine.registry.register(hash(1), adapter.clone());

    let admitted = engine.registry.match_hash(&peer(1, 6881), hash(1)).unwrap();
    assert!(Arc::ptr_eq(&admitted, &registration));
    assert_eq!(adapter.activate_request_count(), 1);

    adapter.deny_activation();
    assert!(engine.registry.match_hash(&peer(2, 6881), hash(1)).is_none());
    assert!(engine.registry.match_hash(&peer(1, 6881), hash(9)).is_none());
}

/// Link matching resolves through the link's hash, so admission lands on
/// the first registration for that hash.
#[test]
fn test_match_link_resolves_hash_first() {
    let engine = TestEngine::new();
    let first = engine.registry.register(hash(1), FakeAdapter::new());
    let second = engine.registry.register(hash(1), FakeAdapter::new());
    second.add_link("by-name", Arc::new(0u32)).unwrap();

    let matched = engine
        .registry
        .match_link(&peer(1, 6881), "by-name")
        .unwrap();
    assert!(Arc::ptr_eq(&matched, &first));

    assert!(engine.registry.match_link(&peer(1, 6881), "no-such").is_none());
}
