//! Multi-valued association caches ("Collection").
//!
//! The live view is the union of the derived members (target entities whose
//! foreign key matches the owner) and the members the caller added
//! explicitly. A populated collection is recomputed whenever its target set
//! or the owner's key changes, and every difference in the view is reported
//! as a collection change.

use crate::container::{association, wrong_type, EntityContainer, SetChange, WriteOrigin};
use crate::observer::{ChangeEvent, CollectionAction};
use crate::subscription::Subscription;
use indexmap::IndexSet;
use std::sync::Arc;
use tether_core::{EntityId, EntityState, GraphResult, Value};
use tether_registry::{AssociationDef, Multiplicity};
use tracing::{debug, trace};

#[derive(Debug, Clone, Default)]
pub(crate) struct CollectionCache {
    /// Computed against the target set and subscribed to it.
    pub loaded: bool,
    /// Derived members followed by explicit extras.
    pub view: IndexSet<EntityId>,
    pub explicit: IndexSet<EntityId>,
}

impl EntityContainer {
    /// Read a collection association, populating it if needed.
    pub fn collection(&mut self, id: EntityId, name: &str) -> GraphResult<Vec<EntityId>> {
        let result = self.ensure_collection(id, name).and_then(|_| {
            Ok(self
                .entity_ref(id)?
                .collections
                .get(name)
                .map(|c| c.view.iter().copied().collect())
                .unwrap_or_default())
        });
        self.finish(result)
    }

    /// Explicitly add a member. It stays in the view across recomputation
    /// until it is deleted or detached from its own set.
    pub fn add_to_collection(&mut self, id: EntityId, name: &str, child: EntityId) -> GraphResult<()> {
        let result = self.add_member(id, name, child);
        self.finish(result)
    }

    /// Remove a member from the live view. A derived member comes back on
    /// the next recomputation; an explicit one is forgotten.
    pub fn remove_from_collection(
        &mut self,
        id: EntityId,
        name: &str,
        child: EntityId,
    ) -> GraphResult<()> {
        let result = self.remove_member(id, name, child);
        self.finish(result)
    }

    pub(crate) fn ensure_collection(&mut self, id: EntityId, name: &str) -> GraphResult<()> {
        let registry = Arc::clone(&self.registry);
        let entity = self.entity_ref(id)?;
        association(&registry, entity, name, Some(Multiplicity::Many))?;

        let loaded = entity.collections.get(name).is_some_and(|c| c.loaded);
        if loaded || !entity.is_attached() {
            return Ok(());
        }
        self.recompute_collection(id, name)
    }

    pub(crate) fn recompute_collection(&mut self, id: EntityId, name: &str) -> GraphResult<()> {
        let registry = Arc::clone(&self.registry);
        let entity = self.entity_ref(id)?;
        let (_, assoc, target) = association(&registry, entity, name, Some(Multiplicity::Many))?;
        let attached = entity.is_attached();
        let previous = entity.collections.get(name).cloned().unwrap_or_default();

        let mut view: IndexSet<EntityId> = if attached {
            self.find_related(&entity.values, assoc, target)
                .into_iter()
                .collect()
        } else {
            IndexSet::new()
        };
        let explicit: IndexSet<EntityId> = previous
            .explicit
            .iter()
            .copied()
            .filter(|child| self.keeps_explicit(*child, attached))
            .collect();
        view.extend(explicit.iter().copied());

        let added: Vec<EntityId> = view
            .iter()
            .filter(|m| !previous.view.contains(*m))
            .copied()
            .collect();
        let removed: Vec<EntityId> = previous
            .view
            .iter()
            .filter(|m| !view.contains(*m))
            .copied()
            .collect();
        trace!(
            entity = %id,
            association = name,
            size = view.len(),
            added = added.len(),
            removed = removed.len(),
            dropped = previous.explicit.len() - explicit.len(),
            "collection recomputed"
        );

        self.entity_mut(id)?.collections.insert(
            name.to_string(),
            CollectionCache {
                loaded: attached,
                view,
                explicit,
            },
        );
        if attached {
            self.subscriptions
                .subscribe(target.id, Subscription::new(id, name));
        }
        if !removed.is_empty() {
            self.observers
                .emit(ChangeEvent::association(id, name, CollectionAction::Remove, removed));
        }
        if !added.is_empty() {
            self.observers
                .emit(ChangeEvent::association(id, name, CollectionAction::Add, added));
        }
        Ok(())
    }

    pub(crate) fn on_collection_target_changed(
        &mut self,
        subscription: &Subscription,
        assoc: &AssociationDef,
        change: &SetChange,
    ) -> GraphResult<()> {
        let Some(cache) = self
            .entities
            .get(&subscription.source)
            .and_then(|e| e.collections.get(&subscription.association))
            .filter(|c| c.loaded)
        else {
            return Ok(());
        };

        let affected = match change {
            SetChange::Added(_) | SetChange::Cleared(_) => true,
            SetChange::Removed(ids) => ids
                .iter()
                .any(|id| cache.view.contains(id) || cache.explicit.contains(id)),
            SetChange::MemberChanged { member, .. } => assoc.other_keys.contains(member),
        };
        if affected {
            self.recompute_collection(subscription.source, &subscription.association)?;
        }
        Ok(())
    }

    /// An explicit member is kept while it is not Deleted, and not Detached
    /// once the owner is attached.
    fn keeps_explicit(&self, child: EntityId, owner_attached: bool) -> bool {
        match self.entities.get(&child).map(|e| e.state) {
            None | Some(EntityState::Deleted) => false,
            Some(EntityState::Detached) => !owner_attached,
            Some(_) => true,
        }
    }

    fn add_member(&mut self, id: EntityId, name: &str, child: EntityId) -> GraphResult<()> {
        let registry = Arc::clone(&self.registry);
        let entity = self.entity_ref(id)?;
        let (_, assoc, target) = association(&registry, entity, name, Some(Multiplicity::Many))?;
        let child_entity = self.entity_ref(child)?;
        if child_entity.type_id != target.id {
            return Err(wrong_type(&registry, child_entity, target));
        }
        let owner_attached = entity.is_attached();
        let implied: Vec<(&str, Value)> = if assoc.insertion_implies_association {
            assoc
                .key_pairs()
                .map(|(this_key, other_key)| {
                    let value = entity.get(this_key).cloned().unwrap_or(Value::Null);
                    (other_key, value)
                })
                .collect()
        } else {
            Vec::new()
        };

        self.ensure_collection(id, name)?;
        for (member, value) in implied {
            self.write_member(child, member, value, WriteOrigin::Caller)?;
        }

        // The child joins its set before the view lists it.
        if owner_attached && self.entity_ref(child)?.state == EntityState::Detached {
            self.add_entity(target.id, child, EntityState::New)?;
        }

        let cache = self
            .entity_mut(id)?
            .collections
            .entry(name.to_string())
            .or_default();
        cache.explicit.insert(child);
        if cache.view.insert(child) {
            self.observers
                .emit(ChangeEvent::association(id, name, CollectionAction::Add, vec![child]));
        }
        debug!(entity = %id, association = name, child = %child, "collection member added");
        Ok(())
    }

    fn remove_member(&mut self, id: EntityId, name: &str, child: EntityId) -> GraphResult<()> {
        self.ensure_collection(id, name)?;
        let Some(cache) = self.entity_mut(id)?.collections.get_mut(name) else {
            return Ok(());
        };
        let explicit = cache.explicit.shift_remove(&child);
        if cache.view.shift_remove(&child) {
            self.observers
                .emit(ChangeEvent::association(id, name, CollectionAction::Remove, vec![child]));
            debug!(entity = %id, association = name, child = %child, explicit, "collection member removed");
        }
        Ok(())
    }
}
