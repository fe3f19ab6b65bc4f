//! Simulated host errors

use tether_core::TetherError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// A method was registered twice for the same class
    #[error("Method {class}.{method} is already registered")]
    DuplicateMethod { class: String, method: String },

    /// Object id does not name a live managed object
    #[error("Managed object {0} does not exist")]
    UnknownObject(u64),

    /// Invalid host configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bridge error
    #[error(transparent)]
    Tether(#[from] TetherError),
}

pub type Result<T> = std::result::Result<T, SimError>;
