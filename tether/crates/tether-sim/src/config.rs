//! Simulated host configuration

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};

/// Upper bound on `collect_threshold`; beyond this automatic collection is
/// effectively disabled and `0` should be used instead.
const MAX_COLLECT_THRESHOLD: u64 = 1 << 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Panic when a handle primitive is invoked while a failure is pending
    /// on the calling thread, as real runtimes leave that undefined
    ///
    /// Default: true
    pub strict_pending_failure: bool,

    /// Allocations between automatic collections (0 = manual only)
    ///
    /// Default: 0
    pub collect_threshold: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            strict_pending_failure: true,
            collect_threshold: 0,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.collect_threshold > MAX_COLLECT_THRESHOLD {
            return Err(SimError::Configuration(format!(
                "collect_threshold {} exceeds {}; use 0 for manual collection",
                self.collect_threshold, MAX_COLLECT_THRESHOLD
            )));
        }
        Ok(())
    }
}
