//! Persistence modes
//!
//! The mode decides who owns destruction authority for a native object and
//! is fixed at construction.

use crate::error::TetherError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-object ownership policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceMode {
    /// Owned by the managed collector. The managed handle is weak while no
    /// native shared owner exists and strong while at least one does.
    #[default]
    Persistent,
    /// Owned by native shared owners. Holds a strong handle for its whole
    /// native lifetime and is destroyed by the last owner.
    Transient,
    /// Like `Transient`, but never installs a back-pointer in managed
    /// storage: the object only lives as long as the native scope wrapping it.
    Scoped,
}

impl PersistenceMode {
    /// Whether this mode has a promote/demote cycle
    pub fn is_persistent(self) -> bool {
        matches!(self, PersistenceMode::Persistent)
    }

    /// Whether the managed object gets a pointer back to the native object
    pub fn installs_back_pointer(self) -> bool {
        !matches!(self, PersistenceMode::Scoped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PersistenceMode::Persistent => "persistent",
            PersistenceMode::Transient => "transient",
            PersistenceMode::Scoped => "scoped",
        }
    }
}

impl fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersistenceMode {
    type Err = TetherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "persistent" => Ok(PersistenceMode::Persistent),
            "transient" => Ok(PersistenceMode::Transient),
            "scoped" | "temporary" => Ok(PersistenceMode::Scoped),
            other => Err(TetherError::InvalidArgument(format!(
                "unknown persistence mode '{}'",
                other
            ))),
        }
    }
}
