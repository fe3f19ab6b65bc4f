//! Shared fixtures for the bridge lifecycle suites
//!
//! Every fixture runs the simulated host in strict pending-failure mode, so
//! a release path that calls into the host with a failure pending panics
//! instead of passing silently.

#![allow(dead_code)]

use std::sync::{Arc, Barrier};
use std::thread;
use tether_core::{ClassInfo, NativeObject, PersistenceMode, Tether, TetherConfig};
use tether_sim::{LocalRef, SimConfig, SimHost};

pub const PERSISTENT_CLASS: &str = "test.PersistentWidget";
pub const TRANSIENT_CLASS: &str = "test.TransientWidget";
pub const SCOPED_CLASS: &str = "test.ScopedWidget";

/// Thread count for acquire/release storms
pub const STORM_THREADS: usize = 2;

/// Acquire/release pairs per storm thread
pub const STORM_ITERATIONS: usize = 1000;

/// Test fixture wiring a simulated host to a bridge
pub struct SimFixture {
    pub host: Arc<SimHost>,
    pub tether: Tether<SimHost>,
}

impl SimFixture {
    /// Fixture with default configuration and the three test classes
    pub fn new() -> Self {
        Self::with_config(SimConfig::default(), TetherConfig::default())
    }

    pub fn with_config(sim: SimConfig, config: TetherConfig) -> Self {
        let host = Arc::new(SimHost::with_config(sim).expect("valid sim config"));
        let tether =
            Tether::with_config(Arc::clone(&host), config).expect("valid tether config");

        for (name, mode) in [
            (PERSISTENT_CLASS, PersistenceMode::Persistent),
            (TRANSIENT_CLASS, PersistenceMode::Transient),
            (SCOPED_CLASS, PersistenceMode::Scoped),
        ] {
            tether
                .classes()
                .register(ClassInfo::new(name, mode))
                .expect("class registration should succeed");
        }

        Self { host, tether }
    }

    /// Allocate a managed object and bind a native object of `mode` to it
    pub fn wrap(&self, mode: PersistenceMode) -> (LocalRef, Arc<NativeObject<SimHost>>) {
        let class = match mode {
            PersistenceMode::Persistent => PERSISTENT_CLASS,
            PersistenceMode::Transient => TRANSIENT_CLASS,
            PersistenceMode::Scoped => SCOPED_CLASS,
        };
        let managed = self.host.allocate(class);
        let object = self
            .tether
            .wrap(class, &managed)
            .expect("wrap should succeed for a registered class");
        (managed, object)
    }
}

/// Run `body` on `threads` threads released together by a barrier
pub fn run_concurrent<F>(threads: usize, body: F)
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let body = Arc::new(body);
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|index| {
            let body = Arc::clone(&body);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                body(index);
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
}
