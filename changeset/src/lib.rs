//! Tether Changeset
//!
//! Turns the pending changes of a container into an ordered list of
//! per-entity entries for submission, and applies the server's per-entry
//! results back onto the container.

mod apply;
mod builder;
mod entry;
mod error;

#[cfg(test)]
pub(crate) mod test_support;

pub use apply::{apply_response, ConflictInfo, EntryResult, SubmitOutcome, SubmitResponse};
pub use builder::ChangeSetBuilder;
pub use entry::{ChangeSet, ChangeSetEntry, EntityOperation};
pub use error::{ChangeSetError, ChangeSetResult};
