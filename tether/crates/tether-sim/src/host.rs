//! Simulated host runtime
//!
//! Implements [`HostRuntime`] over the in-process heap in [`crate::heap`]
//! with a stop-the-world mark-from-roots collector.
//!
//! ```text
//!   collect()
//!     ├─ heap write lock
//!     │    ├─ roots: cells referenced by a LocalRef or StrongRef
//!     │    ├─ mark through links
//!     │    └─ unlink unmarked cells, flag them collected
//!     └─ outside the lock: NativeObject::finalize for each back-pointer
//! ```

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::heap::{LocalRef, ManagedCell, ManagedId, StrongRef, WeakRef};
use crate::value::{SimFailure, SimValue};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tether_core::{canonical_name, HostRuntime, NativeObject};

/// Managed method body
pub type SimMethod =
    Arc<dyn Fn(&LocalRef, &[SimValue]) -> std::result::Result<SimValue, SimFailure> + Send + Sync>;

/// Outcome of one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    /// Managed objects reclaimed
    pub collected: usize,
    /// Native counterparts finalized
    pub finalized: usize,
    /// Managed objects surviving
    pub surviving: usize,
}

/// Host-wide counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostStats {
    pub live_objects: usize,
    pub live_strong: usize,
    pub live_weak: usize,
    pub allocations: u64,
    pub collections: u64,
    pub finalized: u64,
}

#[derive(Default)]
struct Counters {
    live_strong: AtomicUsize,
    live_weak: AtomicUsize,
    allocations: AtomicU64,
    collections: AtomicU64,
    finalized: AtomicU64,
}

pub struct SimHost {
    config: SimConfig,
    next_id: AtomicU64,
    heap: RwLock<FxHashMap<ManagedId, Arc<ManagedCell>>>,
    methods: RwLock<FxHashMap<(String, String), SimMethod>>,
    pending: Mutex<FxHashMap<ThreadId, SimFailure>>,
    counters: Counters,
}

impl SimHost {
    pub fn new() -> Self {
        Self {
            config: SimConfig::default(),
            next_id: AtomicU64::new(1),
            heap: RwLock::new(FxHashMap::default()),
            methods: RwLock::new(FxHashMap::default()),
            pending: Mutex::new(FxHashMap::default()),
            counters: Counters::default(),
        }
    }

    pub fn with_config(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Allocate a managed object of `class`
    ///
    /// Runs a collection when the allocation threshold is reached. The new
    /// object is rooted by the returned reference and survives it.
    pub fn allocate(&self, class: &str) -> LocalRef {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cell = Arc::new(ManagedCell::new(id, &canonical_name(class)));
        self.heap.write().insert(id, Arc::clone(&cell));

        let allocations = self.counters.allocations.fetch_add(1, Ordering::Relaxed) + 1;
        let threshold = self.config.collect_threshold;
        if threshold > 0 && allocations % threshold == 0 {
            log::debug!("Allocation threshold {} reached", threshold);
            self.collect();
        }
        LocalRef(cell)
    }

    /// Look up a live managed object by id
    pub fn get(&self, id: ManagedId) -> Result<LocalRef> {
        self.heap
            .read()
            .get(&id)
            .map(|cell| LocalRef(Arc::clone(cell)))
            .ok_or(SimError::UnknownObject(id))
    }

    pub fn contains(&self, id: ManagedId) -> bool {
        self.heap.read().contains_key(&id)
    }

    /// Native counterpart bound to `target`, if any
    pub fn native_of(&self, target: &LocalRef) -> Option<Arc<NativeObject<SimHost>>> {
        target.back_pointer.lock().clone()
    }

    /// Run a full collection
    pub fn collect(&self) -> CollectionReport {
        let (victims, surviving) = {
            let mut heap = self.heap.write();

            let mut stack: Vec<ManagedId> = heap
                .iter()
                .filter(|(_, cell)| Arc::strong_count(*cell) > 1)
                .map(|(id, _)| *id)
                .collect();
            let mut marked = FxHashSet::default();
            while let Some(id) = stack.pop() {
                if !marked.insert(id) {
                    continue;
                }
                if let Some(cell) = heap.get(&id) {
                    stack.extend(cell.links());
                }
            }

            let dead: Vec<ManagedId> = heap
                .keys()
                .filter(|id| !marked.contains(*id))
                .copied()
                .collect();
            let mut victims = Vec::with_capacity(dead.len());
            for id in dead {
                if let Some(cell) = heap.remove(&id) {
                    cell.collected.store(true, Ordering::Release);
                    victims.push(cell);
                }
            }
            (victims, heap.len())
        };

        let mut report = CollectionReport {
            collected: victims.len(),
            finalized: 0,
            surviving,
        };
        for cell in victims {
            let native = cell.back_pointer.lock().take();
            if let Some(native) = native {
                native.finalize();
                report.finalized += 1;
            }
        }

        self.counters.collections.fetch_add(1, Ordering::Relaxed);
        self.counters
            .finalized
            .fetch_add(report.finalized as u64, Ordering::Relaxed);
        log::debug!(
            "Collection reclaimed {} objects ({} finalized, {} surviving)",
            report.collected,
            report.finalized,
            report.surviving
        );
        report
    }

    /// Register a managed method body for `class`
    pub fn register_method<F>(&self, class: &str, method: &str, body: F) -> Result<()>
    where
        F: Fn(&LocalRef, &[SimValue]) -> std::result::Result<SimValue, SimFailure>
            + Send
            + Sync
            + 'static,
    {
        let key = (canonical_name(class), method.to_string());
        let mut methods = self.methods.write();
        if methods.contains_key(&key) {
            return Err(SimError::DuplicateMethod {
                class: key.0,
                method: key.1,
            });
        }
        methods.insert(key, Arc::new(body));
        Ok(())
    }

    /// Make `failure` pending on the current thread
    pub fn throw(&self, failure: SimFailure) {
        self.pending.lock().insert(thread::current().id(), failure);
    }

    /// Failure pending on the current thread, if any
    pub fn pending_failure(&self) -> Option<SimFailure> {
        self.pending.lock().get(&thread::current().id()).cloned()
    }

    /// Discard the failure pending on the current thread
    pub fn clear_pending_failure(&self) -> Option<SimFailure> {
        self.pending.lock().remove(&thread::current().id())
    }

    pub fn stats(&self) -> HostStats {
        HostStats {
            live_objects: self.heap.read().len(),
            live_strong: self.counters.live_strong.load(Ordering::Acquire),
            live_weak: self.counters.live_weak.load(Ordering::Acquire),
            allocations: self.counters.allocations.load(Ordering::Relaxed),
            collections: self.counters.collections.load(Ordering::Relaxed),
            finalized: self.counters.finalized.load(Ordering::Relaxed),
        }
    }

    fn check_no_pending(&self, operation: &str) {
        if !self.config.strict_pending_failure {
            return;
        }
        if let Some(failure) = self.pending_failure() {
            panic!(
                "host operation '{}' called with pending failure: {}",
                operation, failure
            );
        }
    }

    fn resolve_weak(&self, weak: &WeakRef) -> Option<Arc<ManagedCell>> {
        // Holding the read lock keeps the collector out while we upgrade
        let _heap = self.heap.read();
        weak.cell.upgrade().filter(|cell| !cell.is_collected())
    }
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRuntime for SimHost {
    type Local = LocalRef;
    type Strong = StrongRef;
    type Weak = WeakRef;
    type Failure = SimFailure;
    type Value = SimValue;

    fn new_strong(&self, local: &LocalRef) -> StrongRef {
        self.check_no_pending("new_strong");
        self.counters.live_strong.fetch_add(1, Ordering::AcqRel);
        StrongRef(Arc::clone(&local.0))
    }

    fn new_weak(&self, local: &LocalRef) -> WeakRef {
        self.check_no_pending("new_weak");
        self.counters.live_weak.fetch_add(1, Ordering::AcqRel);
        WeakRef {
            id: local.id(),
            cell: Arc::downgrade(&local.0),
        }
    }

    fn strong_from_weak(&self, weak: &WeakRef) -> Option<StrongRef> {
        self.check_no_pending("strong_from_weak");
        let cell = self.resolve_weak(weak)?;
        self.counters.live_strong.fetch_add(1, Ordering::AcqRel);
        Some(StrongRef(cell))
    }

    fn weak_from_strong(&self, strong: &StrongRef) -> WeakRef {
        self.check_no_pending("weak_from_strong");
        self.counters.live_weak.fetch_add(1, Ordering::AcqRel);
        WeakRef {
            id: strong.id(),
            cell: Arc::downgrade(&strong.0),
        }
    }

    fn local_from_strong(&self, strong: &StrongRef) -> LocalRef {
        self.check_no_pending("local_from_strong");
        LocalRef(Arc::clone(&strong.0))
    }

    fn local_from_weak(&self, weak: &WeakRef) -> Option<LocalRef> {
        self.check_no_pending("local_from_weak");
        self.resolve_weak(weak).map(LocalRef)
    }

    fn delete_strong(&self, strong: StrongRef) {
        self.check_no_pending("delete_strong");
        self.counters.live_strong.fetch_sub(1, Ordering::AcqRel);
        drop(strong);
    }

    fn delete_weak(&self, weak: WeakRef) {
        self.check_no_pending("delete_weak");
        self.counters.live_weak.fetch_sub(1, Ordering::AcqRel);
        drop(weak);
    }

    fn take_pending_failure(&self) -> Option<SimFailure> {
        self.clear_pending_failure()
    }

    fn raise(&self, failure: SimFailure) {
        self.throw(failure);
    }

    fn install_back_pointer(
        &self,
        target: &LocalRef,
        native: Option<Arc<NativeObject<Self>>>,
    ) -> Option<Arc<NativeObject<Self>>> {
        self.check_no_pending("install_back_pointer");
        std::mem::replace(&mut *target.back_pointer.lock(), native)
    }

    fn invoke(
        &self,
        target: &LocalRef,
        class: &str,
        method: &str,
        args: Vec<SimValue>,
    ) -> std::result::Result<SimValue, SimFailure> {
        self.check_no_pending("invoke");
        let body = self
            .methods
            .read()
            .get(&(class.to_string(), method.to_string()))
            .cloned();
        match body {
            Some(body) => body(target, &args),
            None => Err(SimFailure::new(
                "NoSuchMethodError",
                &format!("{}.{}", class, method),
            )),
        }
    }
}
