//! Changeset error types.

use tether_core::GraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChangeSetError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// The response names an entry the changeset does not contain.
    #[error("unknown changeset entry: {0}")]
    UnknownEntry(usize),

    #[error("response contains more than one result for entry {0}")]
    DuplicateResult(usize),
}

/// Result type for changeset operations.
pub type ChangeSetResult<T> = Result<T, ChangeSetError>;
