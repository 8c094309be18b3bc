use std::time::Duration;

use berth_routing::{Clock, SweepTarget};

use crate::*;

/// Queued connections older than the timeout are closed by the sweep
/// thread, and the emptied registration drops off the scheduler.
#[test]
fn test_sweep_evicts_stale_entries() {
    let engine = TestEngine::new();
    let registration = engine.registry.register(hash(1), FakeAdapter::new());

    let conn = FakeConnection::new(peer(1, 6881));
    let record = conn.record();
    registration.route(conn.boxed(), None);
    assert!(engine.scheduler.is_running());
    assert_eq!(engine.scheduler.target_count(), 1);

    engine.clock.advance(10_001);
    assert!(wait_until(|| record.is_closed()));
    assert_eq!(record.close_reason().as_deref(), Some("activation timeout"));
    assert!(wait_until(|| engine.scheduler.target_count() == 0));

    // Nothing left to replay.
    let controller = FakeController::new("alpha");
    registration.activate(controller.clone());
    assert_eq!(controller.received_count(), 0);
}

/// Entries age independently; younger survivors stay queued. Driven by
/// direct sweeps against an otherwise quiet scheduler.
#[test]
fn test_partial_eviction_preserves_survivors() {
    let engine = TestEngine::with_timing(Duration::from_secs(3600), Duration::from_secs(3600));
    let registration = engine.registry.register(hash(1), FakeAdapter::new());

    let old = FakeConnection::new(peer(1, 6881));
    let old_record = old.record();
    registration.route(old.boxed(), None);

    engine.clock.advance(6_000);
    let young = FakeConnection::new(peer(2, 6881));
    let young_record = young.record();
    registration.route(young.boxed(), None);

    // Now eleven seconds on the old entry, five on the young one.
    engine.clock.advance(5_000);
    assert!(registration.sweep(engine.clock.now()));
    assert_eq!(
        old_record.close_reason().as_deref(),
        Some("activation timeout")
    );
    assert!(!young_record.is_closed());

    let controller = FakeController::new("alpha");
    registration.activate(controller.clone());
    assert_eq!(controller.received_count(), 1);
    assert_eq!(engine.factory.transport(0).remote(), peer(2, 6881));
}

/// A backward clock step re-stamps entries instead of evicting them;
/// aging restarts from the re-stamped point.
#[test]
fn test_backward_clock_restamps() {
    let engine = TestEngine::with_timing(Duration::from_secs(3600), Duration::from_secs(3600));
    let registration = engine.registry.register(hash(1), FakeAdapter::new());

    let conn = FakeConnection::new(peer(1, 6881));
    let record = conn.record();
    registration.route(conn.boxed(), None);

    engine.clock.rewind(5_000);
    assert!(registration.sweep(engine.clock.now()));
    assert!(!record.is_closed());

    engine.clock.advance(10_000);
    assert!(registration.sweep(engine.clock.now()));
    assert!(!record.is_closed());

    engine.clock.advance(1);
    assert!(!registration.sweep(engine.clock.now()));
    assert_eq!(record.close_reason().as_deref(), Some("activation timeout"));
}

/// Draining by activation empties the queue: the next sweep drops the
/// registration, the thread idles out, and new work restarts it.
#[test]
fn test_scheduler_idles_out_and_restarts() {
    let engine = TestEngine::with_timing(Duration::from_millis(5), Duration::from_millis(40));
    let registration = engine.registry.register(hash(1), FakeAdapter::new());

    registration.route(FakeConnection::new(peer(1, 6881)).boxed(), None);
    assert!(engine.scheduler.is_running());

    registration.activate(FakeController::new("alpha"));
    assert!(wait_until(|| engine.scheduler.target_count() == 0));
    assert!(wait_until(|| !engine.scheduler.is_running()));

    registration.deactivate();
    registration.route(FakeConnection::new(peer(2, 6881)).boxed(), None);
    assert!(engine.scheduler.is_running());
    assert_eq!(engine.scheduler.target_count(), 1);
}

/// Unregistering an inactive swarm leaves its queue to die by timeout;
/// the scheduler lets go of the registration once the queue empties.
#[test]
fn test_unregistered_queue_drains_by_timeout() {
    let engine = TestEngine::new();
    let registration = engine.registry.register(hash(1), FakeAdapter::new());

    let conn = FakeConnection::new(peer(1, 6881));
    let record = conn.record();
    registration.route(conn.boxed(), None);

    registration.unregister();
    assert!(!record.is_closed());

    engine.clock.advance(10_001);
    assert!(wait_until(|| record.is_closed()));
    assert_eq!(record.close_reason().as_deref(), Some("activation timeout"));
    assert!(wait_until(|| engine.scheduler.target_count() == 0));
}
