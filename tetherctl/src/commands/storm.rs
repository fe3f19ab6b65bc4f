//! Storm command implementation.
//!
//! Hammers one object with concurrent acquire/release pairs and checks the
//! handle strength and transition counters that result.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use tether_core::{HandleState, NativeObject, PersistenceMode, SharedOwner, TetherConfig};
use tether_sim::{SimConfig, SimHost};

use crate::commands::common::{error_messages, Harness, ScenarioReport};
use crate::commands::traits::{Command, CommandDescription};
use crate::error::{CtlError, Result};

/// Arguments for the storm command.
#[derive(Debug, Clone)]
pub struct StormArgs {
    pub threads: usize,
    pub iterations: usize,
    pub mode: PersistenceMode,
    /// Hold a keeper owner across the storm.
    pub hold: bool,
    pub tether: TetherConfig,
    pub host: SimConfig,
}

impl Default for StormArgs {
    fn default() -> Self {
        Self {
            threads: 2,
            iterations: 1000,
            mode: PersistenceMode::Persistent,
            hold: false,
            tether: TetherConfig::default(),
            host: SimConfig::default(),
        }
    }
}

/// Storm command handler.
pub struct StormCommand {
    args: StormArgs,
}

impl StormCommand {
    fn validate(&self) -> Result<()> {
        if self.args.threads == 0 {
            return Err(CtlError::Validation(error_messages::ZERO_THREADS.to_string()));
        }
        if self.args.iterations == 0 {
            return Err(CtlError::Validation(
                error_messages::ZERO_ITERATIONS.to_string(),
            ));
        }
        Ok(())
    }

    /// Native-owned objects die with their last owner, so a storm against
    /// one always needs a keeper or later acquisitions would find it gone.
    fn keeps_owner(&self) -> bool {
        self.args.hold || !self.args.mode.is_persistent()
    }

    pub fn run(&self) -> Result<ScenarioReport> {
        self.validate()?;
        let start = Instant::now();
        let harness = Harness::new(&self.args.tether, &self.args.host)?;
        let (_managed, object) = harness.wrap(self.args.mode)?;

        tracing::info!(
            "Storming {} object {} with {} threads x {} iterations",
            self.args.mode,
            object.id(),
            self.args.threads,
            self.args.iterations
        );

        let keeper = if self.keeps_owner() {
            Some(object.acquire_shared_owner()?)
        } else {
            None
        };

        let violations = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(self.args.threads));
        let handles: Vec<_> = (0..self.args.threads)
            .map(|_| {
                let object = Arc::clone(&object);
                let barrier = Arc::clone(&barrier);
                let violations = Arc::clone(&violations);
                let iterations = self.args.iterations;
                thread::spawn(move || -> Result<()> {
                    barrier.wait();
                    for _ in 0..iterations {
                        let owner = object.acquire_shared_owner()?;
                        if owner.handle_state() != HandleState::Strong {
                            violations.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle
                .join()
                .map_err(|_| CtlError::Validation("storm worker panicked".to_string()))??;
        }

        let mut report = ScenarioReport::new("storm", self.args.mode);
        let violations = violations.load(Ordering::Relaxed);
        report.check(
            "strong while owned",
            violations == 0,
            format!("{} violation(s)", violations),
        );

        if self.args.mode.is_persistent() {
            self.check_persistent(&mut report, &object, keeper);
        } else {
            let before = object.stats();
            report.check(
                "alive while owned",
                before.destructions == 0 && !object.is_destroyed(),
                format!("destructions={}", before.destructions),
            );
            drop(keeper);
            let after = object.stats();
            report.check(
                "destroyed once",
                after.destructions == 1,
                format!("destructions={}", after.destructions),
            );
        }

        Ok(report.with_stats(object.stats(), harness.host.stats(), start.elapsed()))
    }

    fn check_persistent(
        &self,
        report: &mut ScenarioReport,
        object: &Arc<NativeObject<SimHost>>,
        keeper: Option<SharedOwner<SimHost>>,
    ) {
        if keeper.is_some() {
            let stats = object.stats();
            report.check(
                "single promotion",
                stats.promotions == 1 && stats.demotions == 0,
                format!("promotions={} demotions={}", stats.promotions, stats.demotions),
            );
        }
        drop(keeper);

        let stats = object.stats();
        report.check(
            "balanced transitions",
            stats.is_balanced(),
            format!("promotions={} demotions={}", stats.promotions, stats.demotions),
        );
        report.check(
            "weak at rest",
            object.handle_state() == HandleState::Weak,
            object.handle_state().to_string(),
        );
        report.check(
            "retain count zero",
            object.retain_count() == 0,
            object.retain_count().to_string(),
        );
    }
}

impl Command for StormCommand {
    type Args = StormArgs;
    type Output = ScenarioReport;

    fn new(args: Self::Args) -> Self {
        Self { args }
    }

    fn execute(&self) -> Result<Self::Output> {
        self.run()
    }

    fn name() -> &'static str {
        "storm"
    }
}

impl CommandDescription for StormCommand {
    fn description() -> &'static str {
        "Concurrent acquire/release storm on one object"
    }

    fn help() -> &'static str {
        "Runs THREADS threads each acquiring and releasing a shared owner \
         ITERATIONS times, then checks that the managed handle was strong \
         whenever an owner existed and that transitions balance."
    }
}
