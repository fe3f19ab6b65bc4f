//! Lifecycle command implementation.
//!
//! Shares one native-owned object between concurrent owners and checks that
//! it is destroyed exactly once, by the last of them, with a pending host
//! failure carried across the destruction untouched.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use tether_core::{PersistenceMode, TetherConfig};
use tether_sim::{SimConfig, SimFailure};

use crate::commands::common::{error_messages, Harness, ScenarioReport};
use crate::commands::traits::{Command, CommandDescription};
use crate::error::{CtlError, Result};

/// Arguments for the lifecycle command.
#[derive(Debug, Clone)]
pub struct LifecycleArgs {
    pub owners: usize,
    pub mode: PersistenceMode,
    pub tether: TetherConfig,
    pub host: SimConfig,
}

impl Default for LifecycleArgs {
    fn default() -> Self {
        Self {
            owners: 8,
            mode: PersistenceMode::Transient,
            tether: TetherConfig::default(),
            host: SimConfig::default(),
        }
    }
}

/// Lifecycle command handler.
pub struct LifecycleCommand {
    args: LifecycleArgs,
}

impl LifecycleCommand {
    fn validate(&self) -> Result<()> {
        if self.args.owners == 0 {
            return Err(CtlError::Validation(error_messages::ZERO_OWNERS.to_string()));
        }
        if self.args.mode.is_persistent() {
            return Err(CtlError::Validation(
                error_messages::PERSISTENT_LIFECYCLE.to_string(),
            ));
        }
        Ok(())
    }

    pub fn run(&self) -> Result<ScenarioReport> {
        self.validate()?;
        let start = Instant::now();
        let harness = Harness::new(&self.args.tether, &self.args.host)?;
        let (managed, object) = harness.wrap(self.args.mode)?;
        tracing::info!(
            "Sharing {} object {} between {} owners",
            self.args.mode,
            object.id(),
            self.args.owners
        );

        // All owners acquire before any of them releases
        let acquired = Arc::new(Barrier::new(self.args.owners + 1));
        let release = Arc::new(Barrier::new(self.args.owners + 1));
        let handles: Vec<_> = (0..self.args.owners)
            .map(|_| {
                let object = Arc::clone(&object);
                let acquired = Arc::clone(&acquired);
                let release = Arc::clone(&release);
                thread::spawn(move || {
                    let owner = object.acquire_shared_owner();
                    let group = owner.as_ref().map(|owner| owner.group()).ok();
                    acquired.wait();
                    release.wait();
                    drop(owner);
                    group
                })
            })
            .collect();

        acquired.wait();
        let mut report = ScenarioReport::new("lifecycle", self.args.mode);
        report.check(
            "all owners joined",
            object.owner_count() == self.args.owners,
            format!("{} of {}", object.owner_count(), self.args.owners),
        );
        report.check(
            "alive while owned",
            !object.is_destroyed(),
            object.handle_state().to_string(),
        );

        // Keep one owner on this thread so the last release happens here,
        // with a failure pending
        let last = object.acquire_shared_owner()?;
        release.wait();

        let mut groups = Vec::with_capacity(self.args.owners);
        for handle in handles {
            let group = handle
                .join()
                .map_err(|_| CtlError::Validation("owner thread panicked".to_string()))?;
            groups.push(group);
        }
        report.check(
            "single group",
            groups.iter().all(|group| *group == Some(last.group())),
            format!("{} owner(s) in group {}", groups.len(), last.group()),
        );
        report.check(
            "alive until last owner",
            !object.is_destroyed(),
            format!("destructions={}", object.stats().destructions),
        );

        harness
            .host
            .throw(SimFailure::new("RuntimeException", "raised before release"));
        drop(last);
        let pending = harness.host.clear_pending_failure();

        report.check(
            "pending failure preserved",
            pending.as_ref().map(|failure| failure.message.as_str())
                == Some("raised before release"),
            pending
                .map(|failure| failure.to_string())
                .unwrap_or_else(|| "none".to_string()),
        );

        let stats = object.stats();
        report.check(
            "destroyed once",
            stats.destructions == 1 && object.is_destroyed(),
            format!("destructions={}", stats.destructions),
        );
        report.check(
            "back-pointer cleared",
            harness.host.native_of(&managed).is_none(),
            String::new(),
        );
        report.check(
            "strong handle released",
            harness.host.stats().live_strong == 0,
            format!("strong={}", harness.host.stats().live_strong),
        );

        Ok(report.with_stats(stats, harness.host.stats(), start.elapsed()))
    }
}

impl Command for LifecycleCommand {
    type Args = LifecycleArgs;
    type Output = ScenarioReport;

    fn new(args: Self::Args) -> Self {
        Self { args }
    }

    fn execute(&self) -> Result<Self::Output> {
        self.run()
    }

    fn name() -> &'static str {
        "lifecycle"
    }
}

impl CommandDescription for LifecycleCommand {
    fn description() -> &'static str {
        "Shared native ownership of a Transient or Scoped object"
    }

    fn help() -> &'static str {
        "Acquires OWNERS shared owners from concurrent threads, releases them \
         and checks that the object is destroyed exactly once by the last \
         owner, without losing a failure pending at that moment."
    }
}
