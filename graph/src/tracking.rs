//! Change tracking across the container: pending changes, accept/reject,
//! and the per-entity results of a submit.

use crate::container::{EntityContainer, SetChange, WriteOrigin};
use crate::entity::EntityConflict;
use crate::observer::{ChangeEvent, CollectionAction};
use tether_core::{
    push_unique, Attributes, EntityId, EntityState, GraphError, GraphResult, ValidationResult,
};
use tracing::debug;

/// Entities with pending changes, grouped by kind. Within each group
/// entities are ordered by set, then by enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityChangeSet {
    pub added: Vec<EntityId>,
    pub modified: Vec<EntityId>,
    pub removed: Vec<EntityId>,
}

impl EntityChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// Every changed entity: added, then modified, then removed.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.added
            .iter()
            .chain(&self.modified)
            .chain(&self.removed)
            .copied()
    }
}

impl EntityContainer {
    /// Snapshot of every entity whose state is New, Modified or Deleted.
    pub fn get_changes(&self) -> EntityChangeSet {
        let mut changes = EntityChangeSet::default();
        for set in self.sets.values() {
            for id in set.iter() {
                match self.entities.get(&id).map(|e| e.state) {
                    Some(EntityState::New) => changes.added.push(id),
                    Some(EntityState::Modified) => changes.modified.push(id),
                    _ => {}
                }
            }
            changes.removed.extend(set.deleted());
        }
        changes
    }

    pub fn has_changes(&self) -> bool {
        self.sets
            .values()
            .any(|set| set.deleted().next().is_some())
            || self.entities.values().any(|e| {
                matches!(e.state, EntityState::New | EntityState::Modified)
            })
    }

    /// Mark one entity's changes as accepted by the server: New and
    /// Modified become Unmodified, Deleted entities are detached.
    pub fn accept_changes(&mut self, id: EntityId) -> GraphResult<()> {
        let result = self.accept_entity(id);
        self.finish(result)
    }

    /// Accept a change the server applied. `submitted` is the state and
    /// values the entity had when the change was sent and `store` holds
    /// values the server computed.
    ///
    /// An entity that still matches what was sent is accepted like
    /// [`EntityContainer::accept_changes`]. One edited, removed or restored
    /// since keeps that change pending, with its original rebased onto what
    /// the server now holds. Store values never overwrite members edited
    /// since. Returns whether the entity was accepted.
    pub fn accept_submitted(
        &mut self,
        id: EntityId,
        submitted_state: EntityState,
        submitted: &Attributes,
        store: Attributes,
    ) -> GraphResult<bool> {
        let result = self.accept_submitted_entity(id, submitted_state, submitted, store);
        self.finish(result)
    }

    pub fn accept_all_changes(&mut self) -> GraphResult<()> {
        let changes = self.get_changes();
        let result = changes.iter().try_for_each(|id| self.accept_entity(id));
        self.finish(result)
    }

    /// Revert every pending change: New entities are detached, Modified
    /// ones get their original values back, Deleted ones are restored.
    pub fn reject_changes(&mut self) -> GraphResult<()> {
        let result = self.reject_all();
        self.finish(result)
    }

    /// Merge values returned by the server without recording an edit.
    pub fn merge_store_values(&mut self, id: EntityId, values: Attributes) -> GraphResult<()> {
        let result = values
            .into_iter()
            .try_for_each(|(member, value)| {
                self.write_member(id, &member, value, WriteOrigin::Store)
                    .map(|_| ())
            });
        self.finish(result)
    }

    // ==================== Validation and Conflicts ====================

    /// Attach validation errors, skipping structural duplicates. Returns how
    /// many were added.
    pub fn add_validation_errors(
        &mut self,
        id: EntityId,
        errors: impl IntoIterator<Item = ValidationResult>,
    ) -> GraphResult<usize> {
        let entity = self.entity_mut(id)?;
        let mut added = 0;
        for error in errors {
            if push_unique(&mut entity.validation_errors, error) {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn clear_validation_errors(&mut self, id: EntityId) -> GraphResult<()> {
        self.entity_mut(id)?.validation_errors.clear();
        Ok(())
    }

    pub fn set_conflict(&mut self, id: EntityId, conflict: EntityConflict) -> GraphResult<()> {
        self.entity_mut(id)?.conflict = Some(conflict);
        Ok(())
    }

    /// Rebase the original snapshot onto the server values and clear the
    /// conflict, so the next submit retries with the local edits.
    pub fn resolve_conflict(&mut self, id: EntityId) -> GraphResult<()> {
        let entity = self.entity_mut(id)?;
        let state = entity.state;
        let Some(conflict) = entity.conflict.take() else {
            return Err(GraphError::invalid_state(id, state, "entity has no conflict"));
        };
        let Some(store) = conflict.store.clone().filter(|_| !conflict.is_deleted) else {
            entity.conflict = Some(conflict);
            return Err(GraphError::invalid_state(
                id,
                state,
                "entity was deleted on the server",
            ));
        };
        entity.original = Some(store);
        debug!(entity = %id, "conflict resolved");
        Ok(())
    }

    fn accept_entity(&mut self, id: EntityId) -> GraphResult<()> {
        let entity = self.entity_mut(id)?;
        let type_id = entity.type_id;
        entity.validation_errors.clear();
        entity.conflict = None;
        let state = entity.state;
        match state {
            EntityState::New | EntityState::Modified => {
                entity.original = None;
                self.set_state(id, EntityState::Unmodified)
            }
            EntityState::Deleted => self.detach_entity(type_id, id),
            _ => Ok(()),
        }
    }

    fn accept_submitted_entity(
        &mut self,
        id: EntityId,
        submitted_state: EntityState,
        submitted: &Attributes,
        store: Attributes,
    ) -> GraphResult<bool> {
        let entity = self.entity_ref(id)?;
        let state = entity.state;
        if submitted_state == EntityState::Deleted {
            if state == EntityState::Deleted {
                self.accept_entity(id)?;
                return Ok(true);
            }
            debug!(entity = %id, %state, "entity restored while its delete was in flight");
            return Ok(false);
        }
        if state == EntityState::Detached {
            debug!(entity = %id, "entity detached while its change was in flight");
            return Ok(false);
        }

        let unchanged = entity.values == *submitted;
        let store: Attributes = store
            .into_iter()
            .filter(|(member, _)| entity.values.get(member) == submitted.get(member))
            .collect();
        let mut server = submitted.clone();
        server.extend(store.clone());

        if state != EntityState::Deleted {
            for (member, value) in store {
                self.write_member(id, &member, value, WriteOrigin::Store)?;
            }
            if unchanged {
                self.accept_entity(id)?;
                return Ok(true);
            }
        }

        let entity = self.entity_mut(id)?;
        entity.validation_errors.clear();
        entity.conflict = None;
        entity.original = Some(server);
        if state != EntityState::Deleted {
            self.set_state(id, EntityState::Modified)?;
        }
        debug!(entity = %id, %state, "change made during submit kept pending");
        Ok(false)
    }

    fn reject_all(&mut self) -> GraphResult<()> {
        let changes = self.get_changes();
        debug!(
            added = changes.added.len(),
            modified = changes.modified.len(),
            removed = changes.removed.len(),
            "rejecting changes"
        );

        for id in &changes.added {
            let type_id = self.entity_ref(*id)?.type_id;
            self.detach_entity(type_id, *id)?;
        }
        for id in &changes.modified {
            self.revert_values(*id)?;
            self.set_state(*id, EntityState::Unmodified)?;
        }
        for id in &changes.removed {
            self.revert_values(*id)?;
            let type_id = self.entity_ref(*id)?.type_id;
            if let Some(set) = self.sets.get_mut(&type_id) {
                set.insert_live(*id);
            }
            self.set_state(*id, EntityState::Unmodified)?;
            self.observers
                .emit(ChangeEvent::set(type_id, CollectionAction::Add, vec![*id]));
            self.notify_set(type_id, &SetChange::Added(vec![*id]))?;
        }
        for id in changes.iter() {
            if let Some(entity) = self.entities.get_mut(&id) {
                entity.validation_errors.clear();
                entity.conflict = None;
            }
        }
        Ok(())
    }

    fn revert_values(&mut self, id: EntityId) -> GraphResult<()> {
        let Some(original) = self.entity_mut(id)?.original.take() else {
            return Ok(());
        };
        for (member, value) in original {
            self.write_member(id, &member, value, WriteOrigin::Store)?;
        }
        Ok(())
    }
}
