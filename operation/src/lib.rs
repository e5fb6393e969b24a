//! Tether Operation
//!
//! The handle returned by every asynchronous call (load, submit, invoke).
//!
//! Responsibilities:
//! - Drive the Pending → Completing/Canceling → terminal state machine
//! - Run the completion callback exactly once, outside the state lock
//! - Escalate faults that no callback marked handled
//! - Resolve result/cancel races in favor of cancellation

mod cancel;
mod error;
mod fault;
mod kind;
mod operation;

pub use cancel::CancellationToken;
pub use error::{CallbackError, OperationError, OperationResult, UnhandledError};
pub use fault::Fault;
pub use kind::{OperationKind, OperationMessages};
pub use operation::{Operation, OperationBuilder, OperationStatus, UserState};
