//! Applying a submit response to the container.
//!
//! A response carries one optional result per changeset entry. Conflicts
//! take precedence over validation errors; either one rejects the whole
//! submit and leaves every entity in its pending state. Only a response
//! free of both is accepted.

use crate::entry::{ChangeSet, ChangeSetEntry, EntityOperation};
use crate::error::{ChangeSetError, ChangeSetResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tether_core::{push_unique, Attributes, EntityId, EntityState, ValidationResult};
use tether_graph::{EntityConflict, EntityContainer};
use tether_operation::Fault;
use tracing::debug;

/// Conflict reported for one entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictInfo {
    /// Members whose server value no longer matches the submitted original.
    pub members: BTreeSet<String>,
    /// Current server values; absent when the entity was deleted there.
    pub store: Option<Attributes>,
    #[serde(default)]
    pub is_deleted: bool,
}

/// The server's answer for one changeset entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryResult {
    pub entry_id: usize,
    /// Values after the store roundtrip (generated keys, computed members).
    #[serde(default)]
    pub current: Option<Attributes>,
    #[serde(default)]
    pub validation_errors: Vec<ValidationResult>,
    #[serde(default)]
    pub conflict: Option<ConflictInfo>,
}

impl EntryResult {
    pub fn new(entry_id: usize) -> Self {
        Self {
            entry_id,
            ..Self::default()
        }
    }

    pub fn with_current(mut self, current: Attributes) -> Self {
        self.current = Some(current);
        self
    }

    pub fn with_error(mut self, error: ValidationResult) -> Self {
        self.validation_errors.push(error);
        self
    }

    pub fn with_conflict(mut self, conflict: ConflictInfo) -> Self {
        self.conflict = Some(conflict);
        self
    }
}

/// Per-entry results of a submit. Entries without a result are accepted
/// as submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub results: Vec<EntryResult>,
}

impl SubmitResponse {
    pub fn new(results: Vec<EntryResult>) -> Self {
        Self { results }
    }
}

/// Outcome of applying a response.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Every entry was accepted. Entities changed again after the changeset
    /// was built keep those later changes pending.
    Accepted,
    /// Nothing was accepted.
    Rejected {
        fault: Fault,
        entities_in_error: Vec<EntityId>,
    },
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted)
    }
}

/// Apply `response` to the entities of `changeset`.
///
/// Validation errors previously attached to the submitted entities are
/// replaced. Errors are only raised for a response that does not match the
/// changeset or for entities the container no longer tracks.
pub fn apply_response(
    container: &mut EntityContainer,
    changeset: &ChangeSet,
    response: SubmitResponse,
) -> ChangeSetResult<SubmitOutcome> {
    let mut seen = HashSet::new();
    for result in &response.results {
        if changeset.entry(result.entry_id).is_none() {
            return Err(ChangeSetError::UnknownEntry(result.entry_id));
        }
        if !seen.insert(result.entry_id) {
            return Err(ChangeSetError::DuplicateResult(result.entry_id));
        }
    }

    for entry in changeset.entries() {
        container.clear_validation_errors(entry.entity)?;
    }

    let conflicts: Vec<(&ChangeSetEntry, &ConflictInfo)> = response
        .results
        .iter()
        .filter_map(|r| Some((changeset.entry(r.entry_id)?, r.conflict.as_ref()?)))
        .collect();
    if !conflicts.is_empty() {
        return apply_conflicts(container, &conflicts);
    }

    let failed: Vec<&EntryResult> = response
        .results
        .iter()
        .filter(|r| !r.validation_errors.is_empty())
        .collect();
    if !failed.is_empty() {
        return apply_validation(container, changeset, &failed);
    }

    let mut store: HashMap<usize, Attributes> = response
        .results
        .into_iter()
        .filter_map(|r| Some((r.entry_id, r.current?)))
        .collect();
    let mut kept = 0;
    for entry in changeset.entries() {
        let (submitted_state, store) = match entry.operation {
            EntityOperation::Insert => (EntityState::New, store.remove(&entry.id)),
            EntityOperation::Update => (EntityState::Modified, store.remove(&entry.id)),
            EntityOperation::Delete => (EntityState::Deleted, None),
        };
        let accepted = container.accept_submitted(
            entry.entity,
            submitted_state,
            &entry.current,
            store.unwrap_or_default(),
        )?;
        if !accepted {
            kept += 1;
        }
    }
    if kept > 0 {
        debug!(kept, "changes made during submit stay pending");
    }
    debug!(entries = changeset.len(), "submit accepted");
    Ok(SubmitOutcome::Accepted)
}

fn apply_conflicts(
    container: &mut EntityContainer,
    conflicts: &[(&ChangeSetEntry, &ConflictInfo)],
) -> ChangeSetResult<SubmitOutcome> {
    let mut results = Vec::with_capacity(conflicts.len());
    let mut entities = Vec::with_capacity(conflicts.len());

    for (entry, info) in conflicts {
        let message = if info.is_deleted {
            format!("{} {} was deleted on the server", entry.type_name, entry.entity)
        } else {
            format!("{} {} was changed on the server", entry.type_name, entry.entity)
        };
        container.set_conflict(
            entry.entity,
            EntityConflict {
                current: entry.current.clone(),
                original: entry.original.clone(),
                store: info.store.clone(),
                members: info.members.clone(),
                is_deleted: info.is_deleted,
            },
        )?;
        push_unique(
            &mut results,
            ValidationResult::new(message).with_members(info.members.iter().cloned()),
        );
        entities.push(entry.entity);
    }

    debug!(conflicts = entities.len(), "submit rejected with conflicts");
    Ok(SubmitOutcome::Rejected {
        fault: Fault::ConflictDetected(results),
        entities_in_error: entities,
    })
}

fn apply_validation(
    container: &mut EntityContainer,
    changeset: &ChangeSet,
    failed: &[&EntryResult],
) -> ChangeSetResult<SubmitOutcome> {
    let mut results = Vec::new();
    let mut entities = Vec::with_capacity(failed.len());

    for result in failed {
        let Some(entry) = changeset.entry(result.entry_id) else {
            continue;
        };
        container.add_validation_errors(entry.entity, result.validation_errors.iter().cloned())?;
        for error in &result.validation_errors {
            push_unique(&mut results, error.clone());
        }
        entities.push(entry.entity);
    }

    debug!(
        entities = entities.len(),
        errors = results.len(),
        "submit rejected with validation errors"
    );
    Ok(SubmitOutcome::Rejected {
        fault: Fault::ValidationFailed(results),
        entities_in_error: entities,
    })
}
