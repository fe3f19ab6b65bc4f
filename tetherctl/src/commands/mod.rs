//! Scenario commands for tetherctl.
//!
//! Each scenario lives in its own file and implements the
//! [`traits::Command`] trait.

pub mod common;
pub mod traits;

pub mod cycle;
pub mod lifecycle;
pub mod storm;

pub use cycle::{CycleArgs, CycleCommand};
pub use lifecycle::{LifecycleArgs, LifecycleCommand};
pub use storm::{StormArgs, StormCommand};
