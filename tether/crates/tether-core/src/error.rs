//! Error Module - Tether Error Types
//!
//! Two kinds of failure exist in the bridge and they are handled very
//! differently:
//!
//! ## Recoverable-but-loud
//! - `Unresolvable` - the managed counterpart was already collected
//! - `Released` - the native object was already destroyed
//! - `Invocation` - the managed side failed while running a proxied method
//!
//! These are returned to the calling collaborator, which should propagate
//! them rather than act on a null result. Only `Invocation` is recoverable
//! in the retry sense ([`TetherError::is_recoverable`]); the other two are
//! loud reports of collaborator bugs ([`TetherError::is_bug`]).
//!
//! ## Fatal
//! Lifetime invariant violations (promote on a non-persistent object,
//! teardown of a retained object, destruction with a nonzero retain count)
//! mean the two runtimes disagree about ownership. They are never returned
//! as values: [`tether_assert!`] logs and panics.

use crate::object::ObjectId;
use thiserror::Error;

/// Main error type for all Tether operations
#[derive(Debug, Error)]
pub enum TetherError {
    /// Managed counterpart has been collected
    ///
    /// **When returned:** a weak handle no longer resolves. Only reachable
    /// when a collaborator used an object without holding a shared owner.
    #[error("Managed counterpart of object {object} is unresolvable (already collected)")]
    Unresolvable { object: ObjectId },

    /// Native object already destroyed
    ///
    /// **When returned:** acquiring or resolving after the collector or the
    /// last shared owner tore the object down.
    #[error("Object {object} has already been destroyed")]
    Released { object: ObjectId },

    /// Class lookup failed
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// Class registered twice under the same canonical name
    #[error("Class already registered: {0}")]
    DuplicateClass(String),

    /// Managed-side failure raised by a proxied method call
    #[error("Invocation of '{method}' failed: {message}")]
    Invocation { method: String, message: String },

    /// Configuration error
    ///
    /// **Example scenarios:**
    /// - `retain_limit` of zero
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl TetherError {
    /// Check if the caller may retry or handle this error and carry on
    ///
    /// Only managed-side failures qualify. `Unresolvable` and `Released`
    /// are still returned rather than fatal, but retrying them cannot
    /// succeed; see [`TetherError::is_bug`].
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TetherError::Invocation { .. })
    }

    /// Check if this error indicates a collaborator bug
    ///
    /// These are the loud, non-fatal errors: the process keeps running but
    /// the collaborator used an object without holding a shared owner.
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            TetherError::Unresolvable { .. } | TetherError::Released { .. }
        )
    }
}

/// Result type alias for Tether operations
pub type Result<T> = std::result::Result<T, TetherError>;

/// Fatal assertion for lifetime invariants.
///
/// Logs at error level before panicking so the violation shows up in host
/// logs even when the panic message is swallowed by an FFI boundary.
#[macro_export]
macro_rules! tether_assert {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::tether_fatal!($($arg)+);
        }
    };
}

/// Unconditional fatal error, see [`tether_assert!`].
#[macro_export]
macro_rules! tether_fatal {
    ($($arg:tt)+) => {{
        let message = format!($($arg)+);
        $crate::__log::error!("lifetime invariant violated: {}", message);
        panic!("lifetime invariant violated: {}", message)
    }};
}
