//! tetherctl - drive tether lifecycle scenarios from the command line.
//!
//! Every scenario builds a fresh simulated host, binds native objects to it
//! through the bridge and reports a list of checks. A failed check makes
//! the process exit with a non-zero status.

mod commands;
mod config;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tether_core::PersistenceMode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::common::{print_report, ScenarioReport};
use commands::traits::{Command, CommandDescription};
use commands::{
    CycleArgs, CycleCommand, LifecycleArgs, LifecycleCommand, StormArgs, StormCommand,
};
use config::{Config, CONFIG_FILE_NAME};
use error::{CtlError, Result};

/// tetherctl - lifecycle scenarios for the tether bridge
#[derive(Parser, Debug)]
#[command(name = "tetherctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drive tether lifecycle scenarios against the simulated host", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, env = "TETHERCTL_VERBOSE")]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TETHERCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Disable color output
    #[arg(long, global = true, env = "TETHERCTL_NO_COLOR")]
    no_color: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log every promote and demote
    #[arg(long, global = true)]
    trace_transitions: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Concurrent acquire/release storm on one object
    Storm(StormCommandArgs),

    /// Repeated acquire/release/collect on a rooted Persistent object
    Cycle(CycleCommandArgs),

    /// Shared native ownership of a Transient or Scoped object
    Lifecycle(LifecycleCommandArgs),

    /// List available scenarios
    List,

    /// Write the effective configuration to a TOML file
    InitConfig(InitConfigArgs),
}

/// Arguments for the storm subcommand.
#[derive(Parser, Debug)]
struct StormCommandArgs {
    /// Number of threads (default: from config, else CPU count)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Acquire/release pairs per thread
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Persistence mode (persistent, transient, scoped)
    #[arg(short, long)]
    mode: Option<PersistenceMode>,

    /// Hold a keeper owner across the storm
    #[arg(long)]
    hold: bool,
}

/// Arguments for the cycle subcommand.
#[derive(Parser, Debug)]
struct CycleCommandArgs {
    /// Number of acquire/release/collect cycles
    #[arg(short = 'n', long)]
    cycles: Option<usize>,
}

/// Arguments for the lifecycle subcommand.
#[derive(Parser, Debug)]
struct LifecycleCommandArgs {
    /// Number of concurrent owners
    #[arg(short, long)]
    owners: Option<usize>,

    /// Persistence mode (transient or scoped)
    #[arg(short, long)]
    mode: Option<PersistenceMode>,
}

/// Arguments for the init-config subcommand.
#[derive(Parser, Debug)]
struct InitConfigArgs {
    /// Output path
    #[arg(default_value = CONFIG_FILE_NAME)]
    path: PathBuf,

    /// Overwrite an existing file
    #[arg(short, long)]
    force: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    init_logging(cli.verbose || config.verbose, cli.no_color)?;
    if cli.trace_transitions {
        config.tether.trace_transitions = true;
    }

    let json = cli.json;
    if let Some(report) = execute_command(cli.command, config)? {
        print_report(&report, json)?;
        report.into_result()?;
    }
    Ok(())
}

/// Initialize the logging system.
///
/// Also captures records from the `log` facade used by the library crates.
fn init_logging(verbose: bool, no_color: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .with_thread_ids(verbose)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .map_err(|e| CtlError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

fn load_config(config_path: Option<&std::path::Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

fn execute_command(command: Commands, config: Config) -> Result<Option<ScenarioReport>> {
    match command {
        Commands::Storm(args) => execute_storm(args, config).map(Some),
        Commands::Cycle(args) => execute_cycle(args, config).map(Some),
        Commands::Lifecycle(args) => execute_lifecycle(args, config).map(Some),
        Commands::List => {
            list_scenarios();
            Ok(None)
        }
        Commands::InitConfig(args) => {
            init_config(args, &config)?;
            Ok(None)
        }
    }
}

fn init_config(args: InitConfigArgs, config: &Config) -> Result<()> {
    if args.path.exists() && !args.force {
        return Err(CtlError::Config(format!(
            "{} already exists (use --force to overwrite)",
            args.path.display()
        )));
    }
    config.save_to_path(&args.path)?;
    tracing::info!("Wrote configuration to {}", args.path.display());
    Ok(())
}

fn execute_storm(args: StormCommandArgs, config: Config) -> Result<ScenarioReport> {
    let storm_args = StormArgs {
        threads: args.threads.unwrap_or(config.storm.threads),
        iterations: args.iterations.unwrap_or(config.storm.iterations),
        mode: args.mode.unwrap_or(config.storm.mode),
        hold: args.hold || config.storm.hold,
        tether: config.tether,
        host: config.host,
    };
    StormCommand::new(storm_args).execute()
}

fn execute_cycle(args: CycleCommandArgs, config: Config) -> Result<ScenarioReport> {
    let cycle_args = CycleArgs {
        cycles: args.cycles.unwrap_or(config.cycle.cycles),
        tether: config.tether,
        host: config.host,
    };
    CycleCommand::new(cycle_args).execute()
}

fn execute_lifecycle(args: LifecycleCommandArgs, config: Config) -> Result<ScenarioReport> {
    let lifecycle_args = LifecycleArgs {
        owners: args.owners.unwrap_or(config.lifecycle.owners),
        mode: args.mode.unwrap_or(config.lifecycle.mode),
        tether: config.tether,
        host: config.host,
    };
    LifecycleCommand::new(lifecycle_args).execute()
}

fn list_scenarios() {
    let scenarios = [
        (StormCommand::name(), StormCommand::description(), StormCommand::help()),
        (CycleCommand::name(), CycleCommand::description(), CycleCommand::help()),
        (
            LifecycleCommand::name(),
            LifecycleCommand::description(),
            LifecycleCommand::help(),
        ),
    ];
    for (name, description, help) in scenarios {
        println!("{:<10} {}", name, description);
        println!("{:<10} {}", "", help);
    }
}
