//! Shared-Ownership Factory
//!
//! Hands out [`SharedOwner`] values for a [`NativeObject`]. All owners that
//! exist at the same time belong to one group and share one release action.
//! The dedup anchor is the object's owner counter: a group resolves while
//! the counter is nonzero, the same way `std::sync::Weak::upgrade` succeeds
//! only while the strong count is nonzero.
//!
//! ```text
//!   acquire ──► join live group? ──yes──► owners += 1 ─────────────┐
//!                    │ no                                          │
//!                    ▼                                             ▼
//!              lock object ──► retain (Persistent) ──► new group ──► SharedOwner
//!
//!   last drop ──► owners == 0 ──► lock object ──► release / destroy
//! ```

use crate::error::{Result, TetherError};
use crate::handle::HostRuntime;
use crate::object::{ManagedRef, NativeObject};
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{fence, Ordering};
use std::sync::Arc;

impl<H: HostRuntime> NativeObject<H> {
    /// Get a shared owner, joining the live group if one exists
    ///
    /// For Persistent objects the first owner of a group promotes the
    /// managed handle to strong. Returns `Released` if the object has
    /// already been destroyed, and `Unresolvable` if a Persistent object's
    /// managed counterpart was collected before any owner existed.
    pub fn acquire_shared_owner(self: &Arc<Self>) -> Result<SharedOwner<H>> {
        if let Some(group) = self.join_live_group() {
            return Ok(SharedOwner::new(Arc::clone(self), group));
        }

        let mut handle = self.handle.lock();

        // Another thread may have formed a group while we waited
        if let Some(group) = self.join_live_group() {
            return Ok(SharedOwner::new(Arc::clone(self), group));
        }

        if self.is_destroyed_locked(&handle) {
            return Err(TetherError::Released { object: self.id() });
        }
        if self.mode().is_persistent() {
            self.retain(&mut handle)?;
        }

        let group = self.current_group.load(Ordering::Relaxed) + 1;
        self.current_group.store(group, Ordering::Relaxed);
        self.owners.store(1, Ordering::Release);
        self.counters.record_group();
        drop(handle);

        log::trace!("Created owner group {} for {}", group, self.id());
        Ok(SharedOwner::new(Arc::clone(self), group))
    }

    /// Increment the owner count if and only if it is nonzero
    fn join_live_group(&self) -> Option<u64> {
        let mut owners = self.owners.load(Ordering::Relaxed);
        loop {
            if owners == 0 {
                return None;
            }
            match self.owners.compare_exchange_weak(
                owners,
                owners + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(self.current_group.load(Ordering::Relaxed)),
                Err(actual) => owners = actual,
            }
        }
    }

    fn is_destroyed_locked(&self, handle: &ManagedRef<H>) -> bool {
        matches!(handle, ManagedRef::Released)
    }
}

/// Reference-counted native owner of a [`NativeObject`]
///
/// While any owner of a Persistent object exists, the managed counterpart
/// is held strong and cannot be collected. Dropping the last owner of a
/// group runs the group's release action exactly once.
pub struct SharedOwner<H: HostRuntime> {
    object: Arc<NativeObject<H>>,
    group: u64,
}

impl<H: HostRuntime> SharedOwner<H> {
    fn new(object: Arc<NativeObject<H>>, group: u64) -> Self {
        Self { object, group }
    }

    /// Sequence number of the group this owner belongs to
    pub fn group(&self) -> u64 {
        self.group
    }

    /// Whether both owners share one release action
    pub fn same_group(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.object, &other.object) && self.group == other.group
    }

    pub fn object(&self) -> &Arc<NativeObject<H>> {
        &self.object
    }
}

impl<H: HostRuntime> Clone for SharedOwner<H> {
    fn clone(&self) -> Self {
        // We already hold a member, so the group cannot be released under us
        self.object.owners.fetch_add(1, Ordering::Relaxed);
        Self {
            object: Arc::clone(&self.object),
            group: self.group,
        }
    }
}

impl<H: HostRuntime> Drop for SharedOwner<H> {
    fn drop(&mut self) {
        if self.object.owners.fetch_sub(1, Ordering::Release) != 1 {
            return;
        }
        fence(Ordering::Acquire);
        self.object.release_group(self.group);
    }
}

impl<H: HostRuntime> Deref for SharedOwner<H> {
    type Target = NativeObject<H>;

    fn deref(&self) -> &Self::Target {
        &self.object
    }
}

impl<H: HostRuntime> fmt::Debug for SharedOwner<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedOwner")
            .field("object", &self.object.id())
            .field("group", &self.group)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassInfo;
    use crate::config::TetherConfig;
    use crate::mode::PersistenceMode;
    use crate::object::HandleState;
    use crate::testing::{MockHost, MockObject};

    fn construct(
        host: &Arc<MockHost>,
        mode: PersistenceMode,
    ) -> (MockObject, Arc<NativeObject<MockHost>>) {
        let managed = host.allocate();
        let object = NativeObject::construct(
            Arc::clone(host),
            Arc::new(ClassInfo::new("test.Owned", mode)),
            mode,
            &managed,
            Arc::new(TetherConfig::default()),
        );
        (managed, object)
    }

    #[test]
    fn test_owners_share_one_group() {
        let host = Arc::new(MockHost::default());
        let (_managed, object) = construct(&host, PersistenceMode::Persistent);

        let first = object.acquire_shared_owner().unwrap();
        let second = object.acquire_shared_owner().unwrap();
        let third = second.clone();

        assert!(first.same_group(&second));
        assert!(first.same_group(&third));
        assert_eq!(object.owner_count(), 3);
        assert_eq!(object.retain_count(), 1);
        assert_eq!(object.handle_state(), HandleState::Strong);

        drop(first);
        drop(second);
        assert_eq!(object.retain_count(), 1);
        drop(third);

        assert_eq!(object.retain_count(), 0);
        assert_eq!(object.handle_state(), HandleState::Weak);
        assert_eq!(object.stats().groups_created, 1);
        assert_eq!(object.stats().promotions, 1);
        assert_eq!(object.stats().demotions, 1);
    }

    #[test]
    fn test_new_group_after_release() {
        let host = Arc::new(MockHost::default());
        let (_managed, object) = construct(&host, PersistenceMode::Persistent);

        let first = object.acquire_shared_owner().unwrap();
        let first_group = first.group();
        drop(first);

        let second = object.acquire_shared_owner().unwrap();
        assert_ne!(second.group(), first_group);
        assert_eq!(object.retain_count(), 1);
        drop(second);

        let stats = object.stats();
        assert_eq!(stats.groups_created, 2);
        assert_eq!(stats.promotions, 2);
        assert!(stats.is_balanced());
    }

    #[test]
    fn test_transient_last_owner_destroys() {
        let host = Arc::new(MockHost::default());
        let (managed, object) = construct(&host, PersistenceMode::Transient);

        let owners: Vec<_> = (0..3)
            .map(|_| object.acquire_shared_owner().unwrap())
            .collect();
        assert_eq!(object.retain_count(), 0);
        assert!(!object.is_retained());

        drop(owners);

        assert!(object.is_destroyed());
        assert!(host.back_pointer(&managed).is_none());
        assert_eq!(host.live_strong(), 0);
        assert_eq!(object.stats().destructions, 1);
        assert!(matches!(
            object.acquire_shared_owner(),
            Err(TetherError::Released { .. })
        ));
    }

    #[test]
    fn test_scoped_last_owner_destroys() {
        let host = Arc::new(MockHost::default());
        let (_managed, object) = construct(&host, PersistenceMode::Scoped);

        let owner = object.acquire_shared_owner().unwrap();
        assert_eq!(owner.handle_state(), HandleState::Strong);
        drop(owner);

        assert!(object.is_destroyed());
        assert_eq!(host.live_strong(), 0);
    }

    #[test]
    fn test_acquire_after_collection_fails() {
        let host = Arc::new(MockHost::default());
        let (managed, object) = construct(&host, PersistenceMode::Persistent);
        host.collect(&managed);

        assert!(matches!(
            object.acquire_shared_owner(),
            Err(TetherError::Unresolvable { .. })
        ));
        assert_eq!(object.owner_count(), 0);
        assert_eq!(object.retain_count(), 0);
    }

    #[test]
    fn test_release_preserves_pending_failure() {
        let host = Arc::new(MockHost::default());
        let (_managed, object) = construct(&host, PersistenceMode::Transient);
        let owner = object.acquire_shared_owner().unwrap();

        host.raise_failure("IllegalStateException");
        drop(owner);

        assert!(object.is_destroyed());
        assert_eq!(host.calls_with_pending_failure(), 0);
        assert_eq!(
            host.pending_failure().as_deref(),
            Some("IllegalStateException")
        );
    }

    #[test]
    #[should_panic(expected = "outstanding shared owners")]
    fn test_dispose_with_owner_is_fatal() {
        let host = Arc::new(MockHost::default());
        let (_managed, object) = construct(&host, PersistenceMode::Transient);
        let _owner = object.acquire_shared_owner().unwrap();
        object.dispose();
    }

    /// Drop `owner` up to the point where its count reached zero, leaving
    /// the release of its group pending
    fn stall_release(owner: SharedOwner<MockHost>) -> u64 {
        let group = owner.group();
        assert_eq!(owner.owners.fetch_sub(1, Ordering::Release), 1);
        std::mem::forget(owner);
        group
    }

    #[test]
    fn test_stale_release_spares_reacquired_transient() {
        let host = Arc::new(MockHost::default());
        let (managed, object) = construct(&host, PersistenceMode::Transient);

        let stale = stall_release(object.acquire_shared_owner().unwrap());
        let fresh = object.acquire_shared_owner().unwrap();
        assert_ne!(fresh.group(), stale);

        object.release_group(stale);

        assert!(!object.is_destroyed());
        assert_eq!(object.stats().destructions, 0);
        assert_eq!(object.handle_state(), HandleState::Strong);
        assert!(host.back_pointer(&managed).is_some());

        drop(fresh);
        assert!(object.is_destroyed());
        assert_eq!(object.stats().destructions, 1);
        assert_eq!(object.stats().groups_created, 2);
    }

    #[test]
    fn test_stale_release_spares_reacquired_scoped() {
        let host = Arc::new(MockHost::default());
        let (_managed, object) = construct(&host, PersistenceMode::Scoped);

        let stale = stall_release(object.acquire_shared_owner().unwrap());
        let fresh = object.acquire_shared_owner().unwrap();
        object.release_group(stale);

        assert!(!object.is_destroyed());
        assert_eq!(object.stats().destructions, 0);

        drop(fresh);
        assert_eq!(object.stats().destructions, 1);
        assert_eq!(host.live_strong(), 0);
    }

    #[test]
    fn test_overlapping_persistent_groups_promote_once() {
        let host = Arc::new(MockHost::default());
        let (_managed, object) = construct(&host, PersistenceMode::Persistent);

        let stale = stall_release(object.acquire_shared_owner().unwrap());
        assert_eq!(object.retain_count(), 1);

        // The new group retains again while the old release is pending
        let fresh = object.acquire_shared_owner().unwrap();
        assert_eq!(object.retain_count(), 2);
        assert_eq!(object.stats().promotions, 1);

        object.release_group(stale);
        assert_eq!(object.retain_count(), 1);
        assert_eq!(object.handle_state(), HandleState::Strong);
        assert_eq!(object.stats().demotions, 0);

        drop(fresh);
        let stats = object.stats();
        assert_eq!(object.retain_count(), 0);
        assert_eq!(object.handle_state(), HandleState::Weak);
        assert_eq!(stats.promotions, 1);
        assert_eq!(stats.demotions, 1);
        assert_eq!(stats.destructions, 0);
        assert_eq!(host.live_strong(), 0);
        assert_eq!(host.live_weak(), 1);
    }

    #[test]
    fn test_deref_reaches_object() {
        let host = Arc::new(MockHost::default());
        let (_managed, object) = construct(&host, PersistenceMode::Persistent);
        let owner = object.acquire_shared_owner().unwrap();

        assert_eq!(owner.id(), object.id());
        assert!(owner.is_retained());
        assert!(Arc::ptr_eq(owner.object(), &object));
    }
}
