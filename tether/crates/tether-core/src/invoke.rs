//! Method proxy
//!
//! Forwards a named instance method call to the managed counterpart. The
//! method must be registered on the object's class or one of its bases;
//! calling an unregistered or static method through an instance is a
//! programming error on the native side and fails fatally.

use crate::error::{Result, TetherError};
use crate::handle::HostRuntime;
use crate::object::NativeObject;
use crate::tether_fatal;

impl<H: HostRuntime> NativeObject<H> {
    /// Invoke `method` on the managed counterpart
    ///
    /// Callers that may race with the collector should hold a
    /// [`SharedOwner`](crate::SharedOwner) for the duration of the call.
    pub fn call_method(&self, method: &str, args: Vec<H::Value>) -> Result<H::Value> {
        let Some((declaring, spec)) = self.class().find_method(method) else {
            tether_fatal!(
                "method '{}' is not registered on class {}",
                method,
                self.class().name()
            )
        };
        if spec.is_static {
            tether_fatal!(
                "static method '{}' of {} called through instance {}",
                method,
                declaring.name(),
                self.id()
            );
        }

        let target = self.resolve_managed_handle()?;
        self.host
            .invoke(&target, declaring.name(), method, args)
            .map_err(|failure| {
                log::debug!("Method '{}' on {} failed: {}", method, self.id(), failure);
                TetherError::Invocation {
                    method: method.to_string(),
                    message: failure.to_string(),
                }
            })
    }
}
