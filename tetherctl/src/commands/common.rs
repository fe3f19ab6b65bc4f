//! Common types and utilities for tetherctl scenarios.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{
    ClassInfo, NativeObject, ObjectStats, PersistenceMode, Tether, TetherConfig,
};
use tether_sim::{HostStats, LocalRef, SimConfig, SimHost};

use crate::error::{CtlError, Result};

// ============================================================================
// Harness
// ============================================================================

/// Class names registered by the harness, one per persistence mode.
pub mod classes {
    pub const PERSISTENT: &str = "tetherctl.PersistentWidget";
    pub const TRANSIENT: &str = "tetherctl.TransientWidget";
    pub const SCOPED: &str = "tetherctl.ScopedWidget";
}

/// A simulated host wired to a bridge with one class per mode.
pub struct Harness {
    pub host: Arc<SimHost>,
    pub tether: Tether<SimHost>,
}

impl Harness {
    pub fn new(tether: &TetherConfig, host: &SimConfig) -> Result<Self> {
        let host = Arc::new(SimHost::with_config(host.clone())?);
        let tether = Tether::with_config(Arc::clone(&host), tether.clone())?;

        for (name, mode) in [
            (classes::PERSISTENT, PersistenceMode::Persistent),
            (classes::TRANSIENT, PersistenceMode::Transient),
            (classes::SCOPED, PersistenceMode::Scoped),
        ] {
            tether.classes().register(ClassInfo::new(name, mode))?;
        }

        Ok(Self { host, tether })
    }

    /// Allocate a managed object and bind a native object of `mode` to it.
    pub fn wrap(&self, mode: PersistenceMode) -> Result<(LocalRef, Arc<NativeObject<SimHost>>)> {
        let class = match mode {
            PersistenceMode::Persistent => classes::PERSISTENT,
            PersistenceMode::Transient => classes::TRANSIENT,
            PersistenceMode::Scoped => classes::SCOPED,
        };
        let managed = self.host.allocate(class);
        let object = self.tether.wrap(class, &managed)?;
        Ok((managed, object))
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Outcome of a single check within a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Result of running one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub mode: PersistenceMode,
    pub elapsed_ms: u128,
    pub object: ObjectStats,
    pub host: HostStats,
    pub checks: Vec<Check>,
}

impl ScenarioReport {
    pub fn new(scenario: &str, mode: PersistenceMode) -> Self {
        Self {
            scenario: scenario.to_string(),
            mode,
            elapsed_ms: 0,
            object: ObjectStats::default(),
            host: HostStats::default(),
            checks: Vec::new(),
        }
    }

    /// Record a check with the observed value as detail.
    pub fn check(&mut self, name: &str, passed: bool, detail: impl Into<String>) {
        let detail = detail.into();
        if !passed {
            tracing::warn!("Check '{}' failed: {}", name, detail);
        }
        self.checks.push(Check {
            name: name.to_string(),
            passed,
            detail,
        });
    }

    pub fn with_stats(mut self, object: ObjectStats, host: HostStats, elapsed: Duration) -> Self {
        self.object = object;
        self.host = host;
        self.elapsed_ms = elapsed.as_millis();
        self
    }

    pub fn failed(&self) -> usize {
        self.checks.iter().filter(|check| !check.passed).count()
    }

    /// Convert a report with failed checks into an error.
    pub fn into_result(self) -> Result<Self> {
        match self.failed() {
            0 => Ok(self),
            failed => Err(CtlError::ScenarioFailed {
                scenario: self.scenario,
                failed,
            }),
        }
    }
}

/// Print a report as JSON or as human-readable lines.
pub fn print_report(report: &ScenarioReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "{} ({}) finished in {} ms",
        report.scenario, report.mode, report.elapsed_ms
    );
    for check in &report.checks {
        let status = if check.passed {
            output_messages::PASS
        } else {
            output_messages::FAIL
        };
        println!("  {} {:<28} {}", status, check.name, check.detail);
    }
    println!(
        "  promotions={} demotions={} groups={} destructions={}",
        report.object.promotions,
        report.object.demotions,
        report.object.groups_created,
        report.object.destructions
    );
    println!(
        "  host: live_strong={} live_weak={} collections={} finalized={}",
        report.host.live_strong,
        report.host.live_weak,
        report.host.collections,
        report.host.finalized
    );
    Ok(())
}

// ============================================================================
// Messages
// ============================================================================

/// Status markers for human-readable output.
pub mod output_messages {
    pub const PASS: &str = "PASS";
    pub const FAIL: &str = "FAIL";
}

/// Validation error messages.
pub mod error_messages {
    pub const ZERO_THREADS: &str = "thread count must be at least 1";
    pub const ZERO_ITERATIONS: &str = "iteration count must be at least 1";
    pub const ZERO_CYCLES: &str = "cycle count must be at least 1";
    pub const ZERO_OWNERS: &str = "owner count must be at least 1";
    pub const PERSISTENT_LIFECYCLE: &str =
        "lifecycle runs native-owned objects; use transient or scoped";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_registers_all_modes() {
        let harness = Harness::new(&TetherConfig::default(), &SimConfig::default()).unwrap();
        assert_eq!(harness.tether.classes().len(), 3);

        for mode in [
            PersistenceMode::Persistent,
            PersistenceMode::Transient,
            PersistenceMode::Scoped,
        ] {
            let (_managed, object) = harness.wrap(mode).unwrap();
            assert_eq!(object.mode(), mode);
        }
    }

    #[test]
    fn test_report_failures() {
        let mut report = ScenarioReport::new("storm", PersistenceMode::Persistent);
        report.check("balanced", true, "1/1");
        assert!(report.clone().into_result().is_ok());

        report.check("weak", false, "strong");
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.into_result(),
            Err(CtlError::ScenarioFailed { failed: 1, .. })
        ));
    }
}
