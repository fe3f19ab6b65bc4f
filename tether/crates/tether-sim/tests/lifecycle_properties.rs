//! Lifecycle properties under concurrency
//!
//! Each test drives native objects through the simulated host and checks
//! the handle strength, retain count and transition counters that result.

mod common;

use common::{run_concurrent, SimFixture, STORM_ITERATIONS, STORM_THREADS};
use std::sync::{Arc, Barrier};
use tether_core::{HandleState, PersistenceMode};

// ============================================================================
// MUTUAL EXCLUSIVITY
// ============================================================================

/// The object holds exactly one managed reference at every observable point
#[test]
fn test_persistent_holds_exactly_one_reference_during_storm() {
    let fixture = SimFixture::new();
    let (_managed, object) = fixture.wrap(PersistenceMode::Persistent);

    let shared = Arc::clone(&object);
    run_concurrent(8, move |_| {
        for _ in 0..500 {
            let owner = shared.acquire_shared_owner().unwrap();
            assert_eq!(owner.handle_state(), HandleState::Strong);
            assert!(owner.is_retained());
        }
    });

    let stats = fixture.host.stats();
    assert_eq!(stats.live_strong + stats.live_weak, 1);
    assert_eq!(object.handle_state(), HandleState::Weak);
    assert_eq!(object.retain_count(), 0);
}

// ============================================================================
// BALANCED PROMOTE / DEMOTE
// ============================================================================

/// Every promotion is matched by a demotion once all owners are gone
#[test]
fn test_promotions_balance_demotions() {
    let fixture = SimFixture::new();
    let (_managed, object) = fixture.wrap(PersistenceMode::Persistent);

    let shared = Arc::clone(&object);
    run_concurrent(STORM_THREADS, move |_| {
        for _ in 0..STORM_ITERATIONS {
            drop(shared.acquire_shared_owner().unwrap());
        }
    });

    let stats = object.stats();
    assert!(stats.promotions >= 1);
    assert_eq!(stats.promotions, stats.demotions);
    assert_eq!(object.retain_count(), 0);
    assert_eq!(object.owner_count(), 0);
    assert_eq!(object.handle_state(), HandleState::Weak);
}

// ============================================================================
// NO PREMATURE TRANSIENT DESTRUCTION
// ============================================================================

/// A Transient object survives while any owner exists and dies exactly once
#[test]
fn test_transient_survives_while_owned() {
    let fixture = SimFixture::new();
    let (managed, object) = fixture.wrap(PersistenceMode::Transient);
    let keeper = object.acquire_shared_owner().unwrap();

    let shared = Arc::clone(&object);
    run_concurrent(4, move |_| {
        for _ in 0..250 {
            let owner = shared.acquire_shared_owner().unwrap();
            assert!(!owner.is_destroyed());
            assert_eq!(owner.handle_state(), HandleState::Strong);
        }
    });

    assert!(!object.is_destroyed());
    assert_eq!(object.stats().destructions, 0);

    drop(keeper);

    assert!(object.is_destroyed());
    assert_eq!(object.stats().destructions, 1);
    assert!(fixture.host.native_of(&managed).is_none());
    assert_eq!(fixture.host.stats().live_strong, 0);
}

// ============================================================================
// DEDUPLICATION
// ============================================================================

/// Concurrent acquirers with no prior owner end up in a single group
#[test]
fn test_concurrent_acquirers_share_one_group() {
    const ACQUIRERS: usize = 16;

    let fixture = SimFixture::new();
    let (_managed, object) = fixture.wrap(PersistenceMode::Persistent);

    let acquired = Arc::new(Barrier::new(ACQUIRERS + 1));
    let release = Arc::new(Barrier::new(ACQUIRERS + 1));
    let groups = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..ACQUIRERS)
        .map(|_| {
            let object = Arc::clone(&object);
            let acquired = Arc::clone(&acquired);
            let release = Arc::clone(&release);
            let groups = Arc::clone(&groups);
            std::thread::spawn(move || {
                let owner = object.acquire_shared_owner().unwrap();
                groups.lock().push(owner.group());
                acquired.wait();
                release.wait();
                drop(owner);
            })
        })
        .collect();

    acquired.wait();
    assert_eq!(object.owner_count(), ACQUIRERS);
    assert_eq!(object.retain_count(), 1);
    {
        let groups = groups.lock();
        assert!(groups.iter().all(|group| *group == groups[0]));
    }
    release.wait();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = object.stats();
    assert_eq!(stats.groups_created, 1);
    assert_eq!(stats.promotions, 1);
    assert_eq!(stats.demotions, 1);
}

// ============================================================================
// IDEMPOTENT WEAK STATE
// ============================================================================

/// Repeated acquire/release cycles always return to the same weak state
#[test]
fn test_cycles_return_to_weak_state() {
    const CYCLES: usize = 100;

    let fixture = SimFixture::new();
    let (managed, object) = fixture.wrap(PersistenceMode::Persistent);

    for _ in 0..CYCLES {
        let owner = object.acquire_shared_owner().unwrap();
        assert_eq!(owner.handle_state(), HandleState::Strong);
        drop(owner);

        // The local reference roots the managed side across collections
        fixture.host.collect();
        assert_eq!(object.handle_state(), HandleState::Weak);
        assert_eq!(object.retain_count(), 0);
    }

    let stats = object.stats();
    assert_eq!(stats.promotions, CYCLES as u64);
    assert_eq!(stats.demotions, CYCLES as u64);
    assert_eq!(stats.destructions, 0);

    let host = fixture.host.stats();
    assert_eq!(host.live_strong, 0);
    assert_eq!(host.live_weak, 1);
    assert_eq!(object.resolve_managed_handle().unwrap(), managed);
}

/// Without a native owner or managed root, the collector reclaims both halves
#[test]
fn test_unowned_persistent_object_is_collected() {
    let fixture = SimFixture::new();
    let (managed, object) = fixture.wrap(PersistenceMode::Persistent);
    let id = managed.id();

    {
        let _owner = object.acquire_shared_owner().unwrap();
        drop(managed);
        assert_eq!(fixture.host.collect().collected, 0);
        assert!(fixture.host.contains(id));
    }

    let report = fixture.host.collect();
    assert_eq!(report.collected, 1);
    assert_eq!(report.finalized, 1);
    assert!(object.is_destroyed());
    assert_eq!(object.stats().destructions, 1);
    assert_eq!(fixture.host.stats().live_weak, 0);
}

/// Scoped objects never publish a back-pointer and die with their last owner
#[test]
fn test_scoped_object_lifecycle() {
    let fixture = SimFixture::new();
    let (managed, object) = fixture.wrap(PersistenceMode::Scoped);
    assert!(fixture.host.native_of(&managed).is_none());

    let owners: Vec<_> = (0..3)
        .map(|_| object.acquire_shared_owner().unwrap())
        .collect();
    assert_eq!(object.owner_count(), 3);
    assert!(!object.is_retained());
    drop(owners);

    assert!(object.is_destroyed());
    assert_eq!(fixture.host.stats().live_strong, 0);
}
