//! Operation error types.

use crate::fault::Fault;
use crate::kind::OperationKind;
use thiserror::Error;

/// A fault that completed an operation without any handler marking it
/// handled. Displays as the kind-specific message; the remote details stay
/// available on the carried fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UnhandledError {
    pub kind: OperationKind,
    /// Query or method name.
    pub name: String,
    pub message: String,
    pub fault: Fault,
}

impl UnhandledError {
    /// Remote status code, when the fault came from the transport.
    pub fn status(&self) -> Option<u16> {
        self.fault.as_remote().map(|f| f.status)
    }

    /// Server error code, when the fault came from the transport.
    pub fn code(&self) -> Option<i32> {
        self.fault.as_remote().map(|f| f.code)
    }

    /// Server-side stack text, kept as supplementary detail.
    pub fn remote_stack(&self) -> Option<&str> {
        self.fault.as_remote().and_then(|f| f.stack.as_deref())
    }
}

/// Error raised by a completion callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The operation does not allow this transition.
    #[error("invalid operation state: {0}")]
    InvalidState(String),

    /// A fault nobody handled.
    #[error(transparent)]
    Unhandled(#[from] UnhandledError),

    /// The completion callback failed.
    #[error("completion callback failed: {0}")]
    Callback(#[from] CallbackError),
}

impl OperationError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn already_completed() -> Self {
        Self::invalid_state("operation has already completed")
    }

    pub fn as_unhandled(&self) -> Option<&UnhandledError> {
        match self {
            Self::Unhandled(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for operation transitions.
pub type OperationResult<T> = Result<T, OperationError>;
