//! Singleton association caches ("Ref").
//!
//! A reference is resolved lazily by key match against the target set and
//! cached. The cache is invalidated, never eagerly re-resolved, when the
//! source's foreign key changes or when the target set changes in a way
//! that could alter the match. A detached source keeps whatever it had
//! cached.

use crate::container::{association, wrong_type, EntityContainer, SetChange, WriteOrigin};
use crate::observer::ChangeEvent;
use crate::subscription::Subscription;
use std::sync::Arc;
use tether_core::{EntityId, EntityState, GraphResult, Value};
use tether_registry::{AssociationDef, Multiplicity};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefCache {
    /// Resolve on next read. `previous` is the last resolved value, so the
    /// read can report whether the association changed.
    Uncached { previous: Option<Option<EntityId>> },
    Cached(Option<EntityId>),
}

impl RefCache {
    pub(crate) fn invalidate(&mut self) {
        if let RefCache::Cached(value) = *self {
            *self = RefCache::Uncached {
                previous: Some(value),
            };
        }
    }
}

impl EntityContainer {
    /// Read a singleton association, resolving it if needed.
    pub fn reference(&mut self, id: EntityId, name: &str) -> GraphResult<Option<EntityId>> {
        let result = self.resolve_reference(id, name);
        self.finish(result)
    }

    /// Assign a singleton association. The key members are derived from
    /// the target (or cleared where nullable), and a detached target is
    /// added to its set when the source is attached.
    pub fn set_reference(
        &mut self,
        id: EntityId,
        name: &str,
        target: Option<EntityId>,
    ) -> GraphResult<()> {
        let result = self.assign_reference(id, name, target);
        self.finish(result)
    }

    pub(crate) fn resolve_reference(
        &mut self,
        id: EntityId,
        name: &str,
    ) -> GraphResult<Option<EntityId>> {
        let registry = Arc::clone(&self.registry);
        let entity = self.entity_ref(id)?;
        let (_, assoc, target) = association(&registry, entity, name, Some(Multiplicity::One))?;

        let previous = match entity.refs.get(name) {
            Some(RefCache::Cached(value)) => return Ok(*value),
            Some(RefCache::Uncached { previous }) => *previous,
            None => None,
        };
        if !entity.is_attached() {
            return Ok(None);
        }

        let resolved = self
            .find_related(&entity.values, assoc, target)
            .into_iter()
            .next();
        self.entity_mut(id)?
            .refs
            .insert(name.to_string(), RefCache::Cached(resolved));
        self.subscriptions
            .subscribe(target.id, Subscription::new(id, name));
        trace!(entity = %id, association = name, ?resolved, "resolved reference");

        if previous.is_some_and(|p| p != resolved) {
            self.observers.emit(ChangeEvent::property(id, name));
        }
        Ok(resolved)
    }

    pub(crate) fn invalidate_reference(&mut self, id: EntityId, name: &str) -> GraphResult<()> {
        if let Some(cache) = self.entity_mut(id)?.refs.get_mut(name) {
            cache.invalidate();
            trace!(entity = %id, association = name, "reference invalidated");
        }
        Ok(())
    }

    pub(crate) fn on_reference_target_changed(
        &mut self,
        subscription: &Subscription,
        assoc: &AssociationDef,
        change: &SetChange,
    ) {
        let Some(cache) = self
            .entities
            .get_mut(&subscription.source)
            .and_then(|e| e.refs.get_mut(&subscription.association))
        else {
            return;
        };
        let RefCache::Cached(current) = *cache else {
            return;
        };

        let stale = match change {
            SetChange::Added(_) => current.is_none(),
            SetChange::Removed(ids) => current.is_some_and(|t| ids.contains(&t)),
            SetChange::Cleared(_) => true,
            SetChange::MemberChanged { entity, member } => {
                assoc.other_keys.contains(member)
                    && (current.is_none() || current == Some(*entity))
            }
        };
        if stale {
            cache.invalidate();
            trace!(
                entity = %subscription.source,
                association = %subscription.association,
                "reference invalidated by target set"
            );
        }
    }

    fn assign_reference(
        &mut self,
        id: EntityId,
        name: &str,
        target: Option<EntityId>,
    ) -> GraphResult<()> {
        let registry = Arc::clone(&self.registry);
        let (source_type, assoc, target_type) =
            association(&registry, self.entity_ref(id)?, name, Some(Multiplicity::One))?;
        if let Some(target_id) = target {
            let target_entity = self.entity_ref(target_id)?;
            if target_entity.type_id != target_type.id {
                return Err(wrong_type(&registry, target_entity, target_type));
            }
        }

        let current = self.resolve_reference(id, name)?;
        if current == target {
            return Ok(());
        }

        if assoc.is_foreign_key {
            for (this_key, other_key) in assoc.key_pairs() {
                let value = match target {
                    Some(target_id) => self.key_value(target_id, other_key)?,
                    None => Value::Null,
                };
                let nullable = source_type
                    .get_member(this_key)
                    .is_some_and(|m| m.nullable);
                if value.is_null() && !nullable {
                    continue;
                }
                self.write_member(id, this_key, value, WriteOrigin::Association(name))?;
            }
        } else {
            if let Some(previous) = current {
                for (_, other_key) in assoc.key_pairs() {
                    let nullable = target_type
                        .get_member(other_key)
                        .is_some_and(|m| m.nullable);
                    if nullable {
                        self.write_member(previous, other_key, Value::Null, WriteOrigin::Caller)?;
                    }
                }
            }
            if let Some(target_id) = target {
                for (this_key, other_key) in assoc.key_pairs() {
                    let value = self.key_value(id, this_key)?;
                    self.write_member(target_id, other_key, value, WriteOrigin::Caller)?;
                }
            }
        }

        let entity = self.entity_mut(id)?;
        entity
            .refs
            .insert(name.to_string(), RefCache::Cached(target));
        let attached = entity.is_attached();
        if attached {
            self.subscriptions
                .subscribe(target_type.id, Subscription::new(id, name));
        }
        self.observers.emit(ChangeEvent::property(id, name));
        trace!(entity = %id, association = name, ?target, "reference assigned");

        if let Some(target_id) = target {
            if attached && self.entity_ref(target_id)?.state == EntityState::Detached {
                self.add_entity(target_type.id, target_id, EntityState::New)?;
            }
        }
        Ok(())
    }

    fn key_value(&self, id: EntityId, member: &str) -> GraphResult<Value> {
        Ok(self
            .entity_ref(id)?
            .get(member)
            .cloned()
            .unwrap_or(Value::Null))
    }
}
