//! Error handling module for tetherctl.

use tether_core::TetherError;
use tether_sim::SimError;
use thiserror::Error;

/// Main error type for tetherctl.
#[derive(Error, Debug)]
pub enum CtlError {
    /// Error when configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error when command arguments are invalid.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A scenario ran but one or more of its checks failed.
    #[error("Scenario '{scenario}' failed {failed} check(s)")]
    ScenarioFailed { scenario: String, failed: usize },

    /// Error raised by the bridge.
    #[error("Bridge error: {0}")]
    Tether(#[from] TetherError),

    /// Error raised by the simulated host.
    #[error("Host error: {0}")]
    Sim(#[from] SimError),

    /// Error when IO operations fail.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error when JSON serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using CtlError.
pub type Result<T> = std::result::Result<T, CtlError>;
