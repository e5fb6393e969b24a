//! Context error types.

use tether_changeset::ChangeSetError;
use tether_core::GraphError;
use tether_operation::OperationError;
use thiserror::Error;

/// Errors raised synchronously by the context.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("A submit operation is already in progress")]
    SubmitInProgress,

    /// The previous submit failed and nobody marked its error handled.
    #[error("The previous submit failed and its error has not been handled")]
    UnreviewedSubmitError,

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("changeset error: {0}")]
    ChangeSet(#[from] ChangeSetError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;
