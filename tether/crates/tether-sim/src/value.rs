//! Values and failures crossing the simulated boundary

use serde::Serialize;
use std::fmt;

/// Value passed to and returned from managed methods
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SimValue {
    Void,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
}

impl SimValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SimValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SimValue::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl From<i64> for SimValue {
    fn from(value: i64) -> Self {
        SimValue::Int(value)
    }
}

impl From<bool> for SimValue {
    fn from(value: bool) -> Self {
        SimValue::Bool(value)
    }
}

impl From<f64> for SimValue {
    fn from(value: f64) -> Self {
        SimValue::Double(value)
    }
}

impl From<&str> for SimValue {
    fn from(value: &str) -> Self {
        SimValue::Str(value.to_string())
    }
}

/// Managed-side failure (an exception in the simulated runtime)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimFailure {
    pub kind: String,
    pub message: String,
}

impl SimFailure {
    pub fn new(kind: &str, message: &str) -> Self {
        Self {
            kind: kind.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for SimFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
