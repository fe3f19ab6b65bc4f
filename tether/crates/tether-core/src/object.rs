//! Dual-Reference Holder
//!
//! A [`NativeObject`] is the native half of an object that also exists in
//! the managed host. It holds exactly one managed reference at a time:
//!
//! ```text
//!                 acquire (0 -> 1)
//!   ┌──────────┐  ───────────────►  ┌──────────┐
//!   │   Weak   │                    │  Strong  │      Persistent
//!   └──────────┘  ◄───────────────  └──────────┘
//!        │         release (1 -> 0)
//!        │ collector
//!        ▼
//!   ┌──────────┐                    ┌──────────┐
//!   │ Released │  ◄───────────────  │  Strong  │      Transient / Scoped
//!   └──────────┘   last owner drop  └──────────┘
//! ```
//!
//! The retain counter tracks outstanding shared-owner groups. Counters may be
//! read without the object mutex, but the handle itself only changes while
//! the mutex is held.

use crate::config::TetherConfig;
use crate::class::ClassInfo;
use crate::error::{Result, TetherError};
use crate::handle::{HostRuntime, PendingFailureScope};
use crate::mode::PersistenceMode;
use crate::stats::{ObjectStats, TransitionCounters};
use crate::{tether_assert, tether_fatal};
use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a native object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        ObjectId(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The managed reference currently held
pub(crate) enum ManagedRef<H: HostRuntime> {
    Strong(H::Strong),
    Weak(H::Weak),
    Released,
}

impl<H: HostRuntime> ManagedRef<H> {
    fn state(&self) -> HandleState {
        match self {
            ManagedRef::Strong(_) => HandleState::Strong,
            ManagedRef::Weak(_) => HandleState::Weak,
            ManagedRef::Released => HandleState::Released,
        }
    }
}

/// Observable strength of an object's managed reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleState {
    Strong,
    Weak,
    Released,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleState::Strong => "strong",
            HandleState::Weak => "weak",
            HandleState::Released => "released",
        };
        f.write_str(name)
    }
}

/// Native counterpart of a managed object
pub struct NativeObject<H: HostRuntime> {
    id: ObjectId,
    mode: PersistenceMode,
    class: Arc<ClassInfo>,
    pub(crate) host: Arc<H>,
    config: Arc<TetherConfig>,

    /// Outstanding shared-owner groups (Persistent only)
    retain_count: CachePadded<AtomicU32>,

    /// Members of the live shared-owner group; zero means no group resolves
    pub(crate) owners: CachePadded<AtomicUsize>,

    /// Sequence number of the live group
    pub(crate) current_group: AtomicU64,

    /// Non-recursive: no path re-enters the same object's critical section
    pub(crate) handle: Mutex<ManagedRef<H>>,

    pub(crate) counters: TransitionCounters,
}

impl<H: HostRuntime> NativeObject<H> {
    /// Construction entry point
    ///
    /// Persistent objects start with a weak reference since no native code
    /// holds them yet. Transient and Scoped objects keep a strong reference
    /// for their whole native lifetime. All modes but Scoped install a
    /// back-pointer in managed storage.
    pub fn construct(
        host: Arc<H>,
        class: Arc<ClassInfo>,
        mode: PersistenceMode,
        managed: &H::Local,
        config: Arc<TetherConfig>,
    ) -> Arc<Self> {
        let handle = if mode.is_persistent() {
            ManagedRef::Weak(host.new_weak(managed))
        } else {
            ManagedRef::Strong(host.new_strong(managed))
        };

        let object = Arc::new(Self {
            id: ObjectId::next(),
            mode,
            class,
            host,
            config,
            retain_count: CachePadded::new(AtomicU32::new(0)),
            owners: CachePadded::new(AtomicUsize::new(0)),
            current_group: AtomicU64::new(0),
            handle: Mutex::new(handle),
            counters: TransitionCounters::default(),
        });

        if mode.installs_back_pointer() {
            let previous = object
                .host
                .install_back_pointer(managed, Some(Arc::clone(&object)));
            tether_assert!(
                previous.is_none(),
                "managed object already bound to native object {}",
                previous.map(|p| p.id).unwrap_or(object.id)
            );
        }

        log::debug!(
            "Constructed {} object {} of class {}",
            mode,
            object.id,
            object.class.name()
        );
        object
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn mode(&self) -> PersistenceMode {
        self.mode
    }

    pub fn class(&self) -> &Arc<ClassInfo> {
        &self.class
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// Outstanding shared-owner groups holding the managed object strong
    pub fn retain_count(&self) -> u32 {
        self.retain_count.load(Ordering::Acquire)
    }

    /// Whether native owners currently keep the managed object alive
    ///
    /// Always false for Transient and Scoped objects, which hold their
    /// strong reference without a retain cycle.
    pub fn is_retained(&self) -> bool {
        self.retain_count() > 0
    }

    /// Members of the live shared-owner group
    pub fn owner_count(&self) -> usize {
        self.owners.load(Ordering::Acquire)
    }

    pub fn handle_state(&self) -> HandleState {
        self.handle.lock().state()
    }

    pub fn is_destroyed(&self) -> bool {
        self.handle_state() == HandleState::Released
    }

    pub fn stats(&self) -> ObjectStats {
        self.counters.snapshot()
    }

    /// Resolve a scope-local reference for the current call
    ///
    /// Fails with `Unresolvable` when the managed counterpart has been
    /// collected, which can only happen while the retain count is zero.
    pub fn resolve_managed_handle(&self) -> Result<H::Local> {
        let handle = self.handle.lock();
        let local = match &*handle {
            ManagedRef::Strong(strong) => Some(self.host.local_from_strong(strong)),
            ManagedRef::Weak(weak) => self.host.local_from_weak(weak),
            ManagedRef::Released => {
                return Err(TetherError::Released { object: self.id });
            }
        };
        local.ok_or_else(|| {
            log::warn!(
                "Managed counterpart of {} resolved after collection (retain count {})",
                self.id,
                self.retain_count()
            );
            TetherError::Unresolvable { object: self.id }
        })
    }

    /// Raise the retain count, promoting on the 0 -> 1 transition
    ///
    /// Must be called with the object mutex held (`handle` is its guard).
    pub(crate) fn retain(&self, handle: &mut ManagedRef<H>) -> Result<()> {
        tether_assert!(
            self.mode.is_persistent(),
            "attempt to retain non-persistent object {} ({})",
            self.id,
            self.mode
        );

        // Every writer holds the mutex, so check-then-increment cannot race
        let previous = self.retain_count.load(Ordering::Acquire);
        tether_assert!(
            previous < self.config.retain_limit,
            "retain count of {} exceeded limit {}",
            self.id,
            self.config.retain_limit
        );
        self.retain_count.fetch_add(1, Ordering::AcqRel);

        if previous == 0 {
            if let Err(err) = self.promote(handle) {
                self.retain_count.fetch_sub(1, Ordering::AcqRel);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Lower the retain count, demoting on the 1 -> 0 transition
    ///
    /// Must be called with the object mutex held.
    pub(crate) fn release(&self, handle: &mut ManagedRef<H>) {
        tether_assert!(
            self.mode.is_persistent(),
            "attempt to release non-persistent object {} ({})",
            self.id,
            self.mode
        );

        let previous = self.retain_count.fetch_sub(1, Ordering::AcqRel);
        tether_assert!(previous > 0, "retain count of {} underflowed", self.id);

        if previous == 1 {
            self.demote(handle);
        }
    }

    fn promote(&self, handle: &mut ManagedRef<H>) -> Result<()> {
        let strong = match &*handle {
            ManagedRef::Weak(weak) => self
                .host
                .strong_from_weak(weak)
                .ok_or(TetherError::Unresolvable { object: self.id })?,
            ManagedRef::Strong(_) => {
                tether_fatal!("promote of {} while already strong", self.id)
            }
            ManagedRef::Released => return Err(TetherError::Released { object: self.id }),
        };

        if let ManagedRef::Weak(weak) = std::mem::replace(handle, ManagedRef::Strong(strong)) {
            self.host.delete_weak(weak);
        }
        self.counters.record_promotion();
        if self.config.trace_transitions {
            log::trace!("Promoted {} to strong", self.id);
        }
        Ok(())
    }

    fn demote(&self, handle: &mut ManagedRef<H>) {
        let ManagedRef::Strong(strong) = std::mem::replace(handle, ManagedRef::Released) else {
            tether_fatal!("demote of {} without a strong reference", self.id)
        };

        let _failure = PendingFailureScope::new(&*self.host);
        let weak = self.host.weak_from_strong(&strong);
        self.host.delete_strong(strong);
        *handle = ManagedRef::Weak(weak);

        self.counters.record_demotion();
        if self.config.trace_transitions {
            log::trace!("Demoted {} to weak", self.id);
        }
    }

    /// Delete whichever reference is held and unbind from managed storage
    ///
    /// Must be called with the object mutex held. Returns the back-pointer
    /// so the caller can drop it after unlocking.
    fn destroy(&self, handle: &mut ManagedRef<H>) -> Option<Arc<NativeObject<H>>> {
        let _failure = PendingFailureScope::new(&*self.host);
        let back_pointer = match std::mem::replace(handle, ManagedRef::Released) {
            ManagedRef::Strong(strong) => {
                let back_pointer = if self.mode.installs_back_pointer() {
                    let local = self.host.local_from_strong(&strong);
                    self.host.install_back_pointer(&local, None)
                } else {
                    None
                };
                self.host.delete_strong(strong);
                back_pointer
            }
            // The collector already dropped its side of the binding
            ManagedRef::Weak(weak) => {
                self.host.delete_weak(weak);
                None
            }
            ManagedRef::Released => tether_fatal!("{} destroyed twice", self.id),
        };

        self.counters.record_destruction();
        log::debug!("Destroyed {} object {}", self.mode, self.id);
        back_pointer
    }

    /// Collector path: the host collected this object's managed counterpart
    ///
    /// Only valid for objects nobody retains; a nonzero retain count here
    /// means promote/demote went wrong and the process cannot continue.
    pub fn finalize(self: Arc<Self>) {
        let back_pointer = {
            let mut handle = self.handle.lock();
            tether_assert!(
                self.retain_count() == 0,
                "{} finalized while retaining its managed object (retain count {})",
                self.id,
                self.retain_count()
            );
            self.destroy(&mut handle)
        };
        drop(back_pointer);
    }

    /// Native-initiated teardown for Transient and Scoped objects
    ///
    /// Never valid for Persistent objects, whose destruction belongs to the
    /// collector, nor while a shared owner is outstanding.
    pub fn dispose(&self) {
        tether_assert!(
            !self.mode.is_persistent(),
            "explicit teardown of persistent object {}",
            self.id
        );
        tether_assert!(
            self.owner_count() == 0,
            "teardown of {} with {} outstanding shared owners",
            self.id,
            self.owner_count()
        );

        let back_pointer = {
            let mut handle = self.handle.lock();
            self.destroy(&mut handle)
        };
        drop(back_pointer);
    }

    /// Release action of a shared-owner group whose last member was dropped
    pub(crate) fn release_group(&self, group: u64) {
        let back_pointer = {
            let mut handle = self.handle.lock();
            match self.mode {
                PersistenceMode::Persistent => {
                    self.release(&mut handle);
                    None
                }
                PersistenceMode::Transient | PersistenceMode::Scoped => {
                    // A racing acquire may have formed a new group after our
                    // count reached zero; that group's release destroys us.
                    if self.owners.load(Ordering::Acquire) != 0 {
                        log::debug!("{} re-acquired before group {} released", self.id, group);
                        None
                    } else if matches!(*handle, ManagedRef::Released) {
                        None
                    } else {
                        self.destroy(&mut handle)
                    }
                }
            }
        };
        drop(back_pointer);
        log::debug!("Released owner group {} of {}", group, self.id);
    }
}

impl<H: HostRuntime> Drop for NativeObject<H> {
    fn drop(&mut self) {
        // Scoped objects may be dropped without ever being shared
        let handle = std::mem::replace(self.handle.get_mut(), ManagedRef::Released);
        if matches!(handle, ManagedRef::Released) {
            return;
        }

        let _failure = PendingFailureScope::new(&*self.host);
        match handle {
            ManagedRef::Strong(strong) => self.host.delete_strong(strong),
            ManagedRef::Weak(weak) => self.host.delete_weak(weak),
            ManagedRef::Released => {}
        }
    }
}

impl<H: HostRuntime> fmt::Debug for NativeObject<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeObject")
            .field("id", &self.id)
            .field("class", &self.class.name())
            .field("mode", &self.mode)
            .field("retain_count", &self.retain_count())
            .field("owners", &self.owner_count())
            .finish()
    }
}
