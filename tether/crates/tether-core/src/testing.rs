//! Minimal single-heap host used by unit tests

use crate::handle::HostRuntime;
use crate::object::NativeObject;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockObject(u64);

pub struct MockRef(u64);

#[derive(Default)]
struct MockSlot {
    collected: bool,
    back_pointer: Option<Arc<NativeObject<MockHost>>>,
}

#[derive(Default)]
pub struct MockHost {
    next_id: AtomicU64,
    slots: Mutex<FxHashMap<u64, MockSlot>>,
    live_strong: AtomicUsize,
    live_weak: AtomicUsize,
    pending: Mutex<Option<String>>,
    calls_with_pending: AtomicUsize,
    last_call: Mutex<Option<String>>,
}

impl MockHost {
    pub fn allocate(&self) -> MockObject {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.lock().insert(id, MockSlot::default());
        MockObject(id)
    }

    /// Mark `target` collected, handing back its native counterpart
    pub fn collect(&self, target: &MockObject) -> Option<Arc<NativeObject<MockHost>>> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(&target.0)?;
        slot.collected = true;
        slot.back_pointer.take()
    }

    pub fn back_pointer(&self, target: &MockObject) -> Option<Arc<NativeObject<MockHost>>> {
        self.slots
            .lock()
            .get(&target.0)
            .and_then(|slot| slot.back_pointer.clone())
    }

    pub fn live_strong(&self) -> usize {
        self.live_strong.load(Ordering::SeqCst)
    }

    pub fn live_weak(&self) -> usize {
        self.live_weak.load(Ordering::SeqCst)
    }

    pub fn raise_failure(&self, message: &str) {
        *self.pending.lock() = Some(message.to_string());
    }

    pub fn pending_failure(&self) -> Option<String> {
        self.pending.lock().clone()
    }

    /// Handle operations made while a failure was pending
    pub fn calls_with_pending_failure(&self) -> usize {
        self.calls_with_pending.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<String> {
        self.last_call.lock().clone()
    }

    fn check_pending(&self) {
        if self.pending.lock().is_some() {
            self.calls_with_pending.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_collected(&self, id: u64) -> bool {
        self.slots.lock().get(&id).map_or(true, |slot| slot.collected)
    }
}

impl HostRuntime for MockHost {
    type Local = MockObject;
    type Strong = MockRef;
    type Weak = MockRef;
    type Failure = String;
    type Value = i64;

    fn new_strong(&self, local: &MockObject) -> MockRef {
        self.check_pending();
        self.live_strong.fetch_add(1, Ordering::SeqCst);
        MockRef(local.0)
    }

    fn new_weak(&self, local: &MockObject) -> MockRef {
        self.check_pending();
        self.live_weak.fetch_add(1, Ordering::SeqCst);
        MockRef(local.0)
    }

    fn strong_from_weak(&self, weak: &MockRef) -> Option<MockRef> {
        self.check_pending();
        if self.is_collected(weak.0) {
            return None;
        }
        self.live_strong.fetch_add(1, Ordering::SeqCst);
        Some(MockRef(weak.0))
    }

    fn weak_from_strong(&self, strong: &MockRef) -> MockRef {
        self.check_pending();
        self.live_weak.fetch_add(1, Ordering::SeqCst);
        MockRef(strong.0)
    }

    fn local_from_strong(&self, strong: &MockRef) -> MockObject {
        MockObject(strong.0)
    }

    fn local_from_weak(&self, weak: &MockRef) -> Option<MockObject> {
        (!self.is_collected(weak.0)).then_some(MockObject(weak.0))
    }

    fn delete_strong(&self, _strong: MockRef) {
        self.check_pending();
        self.live_strong.fetch_sub(1, Ordering::SeqCst);
    }

    fn delete_weak(&self, _weak: MockRef) {
        self.check_pending();
        self.live_weak.fetch_sub(1, Ordering::SeqCst);
    }

    fn take_pending_failure(&self) -> Option<String> {
        self.pending.lock().take()
    }

    fn raise(&self, failure: String) {
        *self.pending.lock() = Some(failure);
    }

    fn install_back_pointer(
        &self,
        target: &MockObject,
        native: Option<Arc<NativeObject<Self>>>,
    ) -> Option<Arc<NativeObject<Self>>> {
        let mut slots = self.slots.lock();
        let slot = slots.entry(target.0).or_default();
        std::mem::replace(&mut slot.back_pointer, native)
    }

    fn invoke(
        &self,
        _target: &MockObject,
        class: &str,
        method: &str,
        args: Vec<i64>,
    ) -> Result<i64, String> {
        *self.last_call.lock() = Some(format!("{}.{}", class, method));
        match args.first().copied() {
            Some(value) if value < 0 => Err("negative argument".to_string()),
            Some(value) => Ok(value),
            None => Ok(0),
        }
    }
}
