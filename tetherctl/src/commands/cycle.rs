//! Cycle command implementation.
//!
//! Repeats acquire, release and collect on one Persistent object while a
//! managed root keeps it reachable, then drops the root and checks that the
//! collector reclaims both halves.

use std::time::Instant;

use tether_core::{HandleState, PersistenceMode, TetherConfig};
use tether_sim::SimConfig;

use crate::commands::common::{error_messages, Harness, ScenarioReport};
use crate::commands::traits::{Command, CommandDescription};
use crate::error::{CtlError, Result};

/// Arguments for the cycle command.
#[derive(Debug, Clone)]
pub struct CycleArgs {
    pub cycles: usize,
    pub tether: TetherConfig,
    pub host: SimConfig,
}

impl Default for CycleArgs {
    fn default() -> Self {
        Self {
            cycles: 100,
            tether: TetherConfig::default(),
            host: SimConfig::default(),
        }
    }
}

/// Cycle command handler.
pub struct CycleCommand {
    args: CycleArgs,
}

impl CycleCommand {
    pub fn run(&self) -> Result<ScenarioReport> {
        if self.args.cycles == 0 {
            return Err(CtlError::Validation(error_messages::ZERO_CYCLES.to_string()));
        }

        let start = Instant::now();
        let harness = Harness::new(&self.args.tether, &self.args.host)?;
        let (root, object) = harness.wrap(PersistenceMode::Persistent)?;
        tracing::info!("Cycling object {} {} times", object.id(), self.args.cycles);

        let mut not_weak = 0;
        let mut collected_early = 0;
        for cycle in 0..self.args.cycles {
            let owner = object.acquire_shared_owner()?;
            drop(owner);

            let report = harness.host.collect();
            collected_early += report.collected;
            if object.handle_state() != HandleState::Weak || object.retain_count() != 0 {
                tracing::debug!("Cycle {} left {} not weak", cycle, object.id());
                not_weak += 1;
            }
        }

        let mut report = ScenarioReport::new("cycle", PersistenceMode::Persistent);
        report.check(
            "weak after every cycle",
            not_weak == 0,
            format!("{} of {} cycles", not_weak, self.args.cycles),
        );
        report.check(
            "rooted object survives",
            collected_early == 0 && !object.is_destroyed(),
            format!("{} collected", collected_early),
        );

        let stats = object.stats();
        let expected = self.args.cycles as u64;
        report.check(
            "one promotion per cycle",
            stats.promotions == expected && stats.demotions == expected,
            format!("promotions={} demotions={}", stats.promotions, stats.demotions),
        );

        let host = harness.host.stats();
        report.check(
            "single weak handle",
            host.live_strong == 0 && host.live_weak == 1,
            format!("strong={} weak={}", host.live_strong, host.live_weak),
        );

        drop(root);
        let last = harness.host.collect();
        report.check(
            "collected once unrooted",
            last.finalized == 1 && object.is_destroyed(),
            format!("finalized={}", last.finalized),
        );

        Ok(report.with_stats(object.stats(), harness.host.stats(), start.elapsed()))
    }
}

impl Command for CycleCommand {
    type Args = CycleArgs;
    type Output = ScenarioReport;

    fn new(args: Self::Args) -> Self {
        Self { args }
    }

    fn execute(&self) -> Result<Self::Output> {
        self.run()
    }

    fn name() -> &'static str {
        "cycle"
    }
}

impl CommandDescription for CycleCommand {
    fn description() -> &'static str {
        "Repeated acquire/release/collect on a rooted Persistent object"
    }

    fn help() -> &'static str {
        "Runs CYCLES acquire, release and collect rounds and checks that the \
         object returns to the same weak state after each, then checks that \
         it is finalized once its managed root is gone."
    }
}
