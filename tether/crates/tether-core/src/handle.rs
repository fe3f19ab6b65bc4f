//! Handle Primitive - host runtime contract
//!
//! The host runtime owns three reference strengths:
//!
//! - **Local**: scope-bound, freed automatically when the native call frame
//!   that created it exits
//! - **Strong**: prevents collection while held
//! - **Weak**: does not prevent collection, stops resolving once the target
//!   is collected
//!
//! The bridge never implements these. It sequences calls into them, so the
//! only requirement placed on an implementation is the contract documented
//! on each method of [`HostRuntime`].
//!
//! # Thread attachment
//!
//! Every method may only be called from a thread currently attached to the
//! host runtime. This is an external precondition and is not checked here.

use crate::object::NativeObject;
use std::fmt;
use std::sync::Arc;

/// Interface the bridge requires from the managed host runtime
pub trait HostRuntime: Send + Sync + Sized + 'static {
    /// Scope-local reference
    type Local: Clone;

    /// Reference that keeps the managed object alive
    type Strong: Send + Sync;

    /// Reference that does not keep the managed object alive
    type Weak: Send + Sync;

    /// Failure raised by the managed side (an exception, in most runtimes)
    type Failure: Send + fmt::Display;

    /// Value passed to and returned from managed methods
    type Value: Send;

    /// Create a strong reference from a local one
    fn new_strong(&self, local: &Self::Local) -> Self::Strong;

    /// Create a weak reference from a local one
    fn new_weak(&self, local: &Self::Local) -> Self::Weak;

    /// Create a strong reference from a weak one
    ///
    /// Returns `None` if the target has been collected.
    fn strong_from_weak(&self, weak: &Self::Weak) -> Option<Self::Strong>;

    /// Create a weak reference from a strong one
    fn weak_from_strong(&self, strong: &Self::Strong) -> Self::Weak;

    /// Resolve a strong reference to a scope-local one
    fn local_from_strong(&self, strong: &Self::Strong) -> Self::Local;

    /// Resolve a weak reference to a scope-local one
    ///
    /// Returns `None` if the target has been collected.
    fn local_from_weak(&self, weak: &Self::Weak) -> Option<Self::Local>;

    /// Delete a strong reference
    fn delete_strong(&self, strong: Self::Strong);

    /// Delete a weak reference
    fn delete_weak(&self, weak: Self::Weak);

    /// Capture and clear the failure pending on the current thread
    ///
    /// After this returns no failure may be pending on the calling thread.
    fn take_pending_failure(&self) -> Option<Self::Failure>;

    /// Make `failure` pending on the current thread again
    fn raise(&self, failure: Self::Failure);

    /// Store (or clear, with `None`) the pointer from the managed object back
    /// to its native counterpart, returning the previous value
    ///
    /// The host uses this pointer to run [`NativeObject::finalize`] when it
    /// collects the managed object.
    fn install_back_pointer(
        &self,
        target: &Self::Local,
        native: Option<Arc<NativeObject<Self>>>,
    ) -> Option<Arc<NativeObject<Self>>>;

    /// Invoke an instance method on the managed object
    ///
    /// `class` is the registered class that declares `method`.
    fn invoke(
        &self,
        target: &Self::Local,
        class: &str,
        method: &str,
        args: Vec<Self::Value>,
    ) -> std::result::Result<Self::Value, Self::Failure>;
}

/// Save/clear/restore guard around host calls made from a release path
///
/// Release actions run whenever a shared owner falls out of scope, which
/// may be while a managed failure is still pending on the thread. Calling
/// into the host in that state is undefined in most runtimes, and dropping
/// the failure would lose it. The guard captures and clears the failure when
/// created and re-raises it when dropped, after all handle operations made
/// under it have completed.
pub struct PendingFailureScope<'a, H: HostRuntime> {
    host: &'a H,
    saved: Option<H::Failure>,
}

impl<'a, H: HostRuntime> PendingFailureScope<'a, H> {
    pub fn new(host: &'a H) -> Self {
        let saved = host.take_pending_failure();
        if let Some(failure) = &saved {
            log::debug!("Deferring pending host failure across release: {}", failure);
        }
        Self { host, saved }
    }
}

impl<H: HostRuntime> Drop for PendingFailureScope<'_, H> {
    fn drop(&mut self) {
        if let Some(failure) = self.saved.take() {
            self.host.raise(failure);
        }
    }
}
