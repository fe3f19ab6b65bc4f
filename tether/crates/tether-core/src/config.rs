//! Configuration Module - Bridge Tuning Parameters

use crate::error::{Result, TetherError};
use crate::mode::PersistenceMode;
use serde::{Deserialize, Serialize};

/// Default upper bound on concurrently outstanding owner groups per object.
///
/// Matches an 8-bit retain counter. The count exceeds one only while a
/// group's last owner has dropped but its release has not yet taken the
/// object mutex, and a new group was created in between. Each such stalled
/// release adds one, so the limit caps how many threads may sit between
/// their final drop and the mutex at once. Raise it for hosts that drop
/// owners from more threads than that.
pub const DEFAULT_RETAIN_LIMIT: u32 = u8::MAX as u32;

/// Bridge configuration
///
/// # Examples
///
/// ```rust
/// use tether_core::TetherConfig;
///
/// let config = TetherConfig {
///     trace_transitions: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    /// Emit a trace record for every promote, demote and destruction
    ///
    /// Default: false
    pub trace_transitions: bool,

    /// Maximum retain count per object before the bridge treats the object
    /// as leaking and fails fatally
    ///
    /// Default: 255
    pub retain_limit: u32,

    /// Persistence mode used when a class is registered without one
    ///
    /// Default: Persistent
    pub default_mode: PersistenceMode,
}

impl Default for TetherConfig {
    fn default() -> Self {
        Self {
            trace_transitions: false,
            retain_limit: DEFAULT_RETAIN_LIMIT,
            default_mode: PersistenceMode::Persistent,
        }
    }
}

impl TetherConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.retain_limit == 0 {
            return Err(TetherError::Configuration(
                "retain_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
