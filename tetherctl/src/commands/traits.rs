//! Command traits for tetherctl.
//!
//! Every scenario command implements [`Command`] so the dispatcher in
//! `main.rs` treats them uniformly.

use crate::error::Result;

/// Standard command trait that all tetherctl scenarios implement.
pub trait Command {
    /// The arguments type for this command.
    type Args;

    /// The output type returned by this command.
    type Output;

    /// Create a new command instance with the given arguments.
    fn new(args: Self::Args) -> Self;

    /// Execute the command.
    fn execute(&self) -> Result<Self::Output>;

    /// Get the command name.
    fn name() -> &'static str;
}

/// Human-readable description of a command.
pub trait CommandDescription {
    /// A brief one-line description.
    fn description() -> &'static str;

    /// Multi-line help text explaining what the scenario checks.
    fn help() -> &'static str;
}
