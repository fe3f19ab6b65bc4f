//! Simulated managed heap
//!
//! Each managed object is a [`ManagedCell`] owned by the heap table. Handles
//! hold the cell directly:
//!
//! - [`LocalRef`] and [`StrongRef`] keep an `Arc` to the cell and therefore
//!   act as collector roots
//! - [`WeakRef`] keeps a `std::sync::Weak` and only resolves while the cell
//!   is in the table
//!
//! A cell is a root when anything besides the heap table holds its `Arc`.
//! Objects reachable from a root through [`ManagedCell::link`] survive too.

use crate::value::SimValue;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tether_core::NativeObject;

use crate::host::SimHost;

/// Identity of a simulated managed object
pub type ManagedId = u64;

pub struct ManagedCell {
    id: ManagedId,
    class: String,
    pub(crate) collected: AtomicBool,
    pub(crate) back_pointer: Mutex<Option<Arc<NativeObject<SimHost>>>>,
    fields: Mutex<FxHashMap<String, SimValue>>,
    links: Mutex<Vec<ManagedId>>,
}

impl ManagedCell {
    pub(crate) fn new(id: ManagedId, class: &str) -> Self {
        Self {
            id,
            class: class.to_string(),
            collected: AtomicBool::new(false),
            back_pointer: Mutex::new(None),
            fields: Mutex::new(FxHashMap::default()),
            links: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> ManagedId {
        self.id
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn is_collected(&self) -> bool {
        self.collected.load(Ordering::Acquire)
    }

    pub fn get_field(&self, name: &str) -> Option<SimValue> {
        self.fields.lock().get(name).cloned()
    }

    pub fn set_field(&self, name: &str, value: SimValue) {
        self.fields.lock().insert(name.to_string(), value);
    }

    /// Make `target` reachable from this object
    pub fn link(&self, target: &LocalRef) {
        self.links.lock().push(target.id());
    }

    pub fn unlink(&self, target: &LocalRef) {
        self.links.lock().retain(|id| *id != target.id());
    }

    pub(crate) fn links(&self) -> Vec<ManagedId> {
        self.links.lock().clone()
    }
}

impl fmt::Debug for ManagedCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedCell")
            .field("id", &self.id)
            .field("class", &self.class)
            .field("collected", &self.is_collected())
            .finish()
    }
}

/// Scope-local reference
#[derive(Clone)]
pub struct LocalRef(pub(crate) Arc<ManagedCell>);

impl LocalRef {
    pub fn id(&self) -> ManagedId {
        self.0.id
    }

    pub fn cell(&self) -> &ManagedCell {
        &self.0
    }
}

impl std::ops::Deref for LocalRef {
    type Target = ManagedCell;

    fn deref(&self) -> &ManagedCell {
        &self.0
    }
}

impl PartialEq for LocalRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for LocalRef {}

impl fmt::Debug for LocalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalRef({})", self.0.id)
    }
}

/// Reference that keeps its target alive
pub struct StrongRef(pub(crate) Arc<ManagedCell>);

impl StrongRef {
    pub fn id(&self) -> ManagedId {
        self.0.id
    }
}

/// Reference that does not keep its target alive
pub struct WeakRef {
    pub(crate) id: ManagedId,
    pub(crate) cell: Weak<ManagedCell>,
}

impl WeakRef {
    pub fn id(&self) -> ManagedId {
        self.id
    }
}
