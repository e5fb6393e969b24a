//! Faults an operation can complete with.

use serde::{Deserialize, Serialize};
use tether_core::{RemoteFault, ValidationResult};
use thiserror::Error;

/// Why an operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Fault {
    /// Transport or server failure.
    #[error("{0}")]
    Remote(RemoteFault),

    /// The server rejected the request with validation results.
    #[error("validation failed with {} error(s)", .0.len())]
    ValidationFailed(Vec<ValidationResult>),

    /// Concurrency conflicts, one result per conflicting entity naming the
    /// conflicting members.
    #[error("{} conflict(s) detected", .0.len())]
    ConflictDetected(Vec<ValidationResult>),
}

impl Fault {
    pub fn remote(status: u16, code: i32, message: impl Into<String>) -> Self {
        Self::Remote(RemoteFault::new(status, code, message))
    }

    pub fn as_remote(&self) -> Option<&RemoteFault> {
        match self {
            Fault::Remote(fault) => Some(fault),
            _ => None,
        }
    }

    /// Validation or conflict results carried by the fault.
    pub fn results(&self) -> &[ValidationResult] {
        match self {
            Fault::Remote(_) => &[],
            Fault::ValidationFailed(results) | Fault::ConflictDetected(results) => results,
        }
    }
}

impl From<RemoteFault> for Fault {
    fn from(fault: RemoteFault) -> Self {
        Fault::Remote(fault)
    }
}
