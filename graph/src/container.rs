//! The entity container.
//!
//! The container owns every entity in an arena keyed by [`EntityId`] and
//! one [`EntitySet`] per entity type. All mutation goes through it so that
//! set membership, key indexes, association caches and change events stay
//! consistent. Events raised during a public call are delivered when the
//! call returns.

use crate::entity::Entity;
use crate::observer::{ChangeEvent, CollectionAction, ObserverId, ObserverScope, Observers};
use crate::reference::RefCache;
use crate::set::EntitySet;
use crate::subscription::SubscriptionTable;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tether_core::{
    Attributes, EntityId, EntityKey, EntityState, GraphError, GraphResult, TypeId, Value,
};
use tether_registry::{
    AssociationDef, EntitySetOperations, EntityTypeDef, MemberDef, Multiplicity, Registry,
};
use tracing::{debug, trace};

/// Structural change of a set, dispatched to the caches subscribed to it.
#[derive(Debug)]
pub(crate) enum SetChange {
    Added(Vec<EntityId>),
    Removed(Vec<EntityId>),
    Cleared(Vec<EntityId>),
    MemberChanged { entity: EntityId, member: String },
}

/// Who is writing a member value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteOrigin<'a> {
    Caller,
    /// An association setter writing derived key values. The cache of that
    /// association is updated by the setter itself.
    Association(&'a str),
    /// Values coming back from the server. No change tracking.
    Store,
}

/// Identity map of entities, grouped into one set per entity type.
#[derive(Debug)]
pub struct EntityContainer {
    pub(crate) registry: Arc<Registry>,
    pub(crate) entities: HashMap<EntityId, Entity>,
    pub(crate) sets: IndexMap<TypeId, EntitySet>,
    pub(crate) subscriptions: SubscriptionTable,
    pub(crate) observers: Observers,
    next_id: u64,
}

impl EntityContainer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            entities: HashMap::new(),
            sets: IndexMap::new(),
            subscriptions: SubscriptionTable::default(),
            observers: Observers::default(),
            next_id: 0,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // ==================== Entities ====================

    /// Create a detached entity. Omitted members take their declared
    /// initial value.
    pub fn create(&mut self, type_name: &str, values: Attributes) -> GraphResult<EntityId> {
        let registry = Arc::clone(&self.registry);
        let type_def = registry
            .get_type_by_name(type_name)
            .ok_or_else(|| GraphError::unknown_type(type_name))?;
        let values = complete_values(type_def, values)?;

        let id = self.allocate_id();
        self.entities.insert(id, Entity::new(id, type_def.id, values));
        trace!(entity = %id, type_name, "created entity");
        Ok(id)
    }

    /// Get an entity, attached or not.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Read one member of an entity.
    pub fn value(&self, id: EntityId, member: &str) -> Option<&Value> {
        self.entities.get(&id)?.get(member)
    }

    /// Write a member. Key changes re-index the entity; foreign key changes
    /// invalidate the caches built on them.
    pub fn set_value(
        &mut self,
        id: EntityId,
        member: &str,
        value: impl Into<Value>,
    ) -> GraphResult<()> {
        let result = self
            .write_member(id, member, value.into(), WriteOrigin::Caller)
            .map(|_| ());
        self.finish(result)
    }

    // ==================== Sets ====================

    /// Get the set for a type, creating it on first use.
    pub fn get_set(&mut self, type_name: &str) -> GraphResult<EntitySetMut<'_>> {
        let registry = Arc::clone(&self.registry);
        let type_def = registry
            .get_type_by_name(type_name)
            .ok_or_else(|| GraphError::unknown_type(type_name))?;
        self.ensure_set(type_def);
        Ok(EntitySetMut {
            container: self,
            type_id: type_def.id,
        })
    }

    /// The set for a type, if it has been created.
    pub fn set(&self, type_name: &str) -> Option<&EntitySet> {
        let type_id = self.registry.get_type_id(type_name)?;
        self.sets.get(&type_id)
    }

    /// All sets in creation order.
    pub fn sets(&self) -> impl Iterator<Item = &EntitySet> {
        self.sets.values()
    }

    /// Find a live entity by type and key.
    pub fn find(&self, type_name: &str, key: &EntityKey) -> Option<EntityId> {
        self.set(type_name)?.find(key)
    }

    /// Number of association caches currently listening to a set.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    // ==================== Observation ====================

    /// Register a change listener. Observing a collection association
    /// populates it when its owner is attached, and keeps it populated
    /// once the owner joins a set.
    pub fn observe(
        &mut self,
        scope: ObserverScope,
        listener: impl FnMut(&ChangeEvent) + 'static,
    ) -> GraphResult<ObserverId> {
        if let ObserverScope::Association { entity, name } = &scope {
            let registry = Arc::clone(&self.registry);
            association(&registry, self.entity_ref(*entity)?, name, Some(Multiplicity::Many))?;
            let result = self.ensure_collection(*entity, name);
            self.finish(result)?;
        }
        Ok(self.observers.add(scope, Box::new(listener)))
    }

    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    // ==================== Releasing ====================

    /// Number of entities held by the container, detached ones included.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Drop a detached entity together with its listeners. Returns false
    /// while another entity's cached reference or collection still points
    /// at it.
    pub fn release(&mut self, id: EntityId) -> GraphResult<bool> {
        let state = self.entity_ref(id)?.state;
        if state != EntityState::Detached {
            return Err(GraphError::invalid_state(
                id,
                state,
                "only detached entities can be released",
            ));
        }
        if self.is_referenced(id, &HashSet::from([id])) {
            return Ok(false);
        }
        self.drop_entity(id);
        Ok(true)
    }

    /// Drop every detached entity that no remaining entity refers to.
    /// Returns how many were dropped.
    pub fn purge_detached(&mut self) -> usize {
        let mut releasing: HashSet<EntityId> = self
            .entities
            .values()
            .filter(|e| e.state == EntityState::Detached)
            .map(|e| e.id)
            .collect();
        loop {
            let kept: Vec<EntityId> = releasing
                .iter()
                .copied()
                .filter(|id| self.is_referenced(*id, &releasing))
                .collect();
            if kept.is_empty() {
                break;
            }
            for id in kept {
                releasing.remove(&id);
            }
        }

        for id in &releasing {
            self.drop_entity(*id);
        }
        debug!(released = releasing.len(), "detached entities purged");
        releasing.len()
    }

    /// True when an entity outside `releasing` refers to `id`.
    fn is_referenced(&self, id: EntityId, releasing: &HashSet<EntityId>) -> bool {
        self.entities
            .values()
            .filter(|e| !releasing.contains(&e.id))
            .any(|e| e.refers_to(id))
    }

    fn drop_entity(&mut self, id: EntityId) {
        self.entities.remove(&id);
        self.subscriptions.unsubscribe_source(id);
        let observers = self.observers.remove_entity(id);
        trace!(entity = %id, observers, "entity released");
    }

    // ==================== Related Entities ====================

    /// Entities currently related through an association, without
    /// populating or subscribing any cache.
    pub fn related(&self, id: EntityId, name: &str) -> GraphResult<Vec<EntityId>> {
        let entity = self.entity_ref(id)?;
        let (_, assoc, target) = association(&self.registry, entity, name, None)?;

        if assoc.is_collection() {
            if let Some(cache) = entity.collections.get(name).filter(|c| c.loaded) {
                return Ok(cache.view.iter().copied().collect());
            }
            let mut members = self.find_related(&entity.values, assoc, target);
            if let Some(cache) = entity.collections.get(name) {
                for child in &cache.explicit {
                    if !members.contains(child) {
                        members.push(*child);
                    }
                }
            }
            return Ok(members);
        }

        match entity.refs.get(name) {
            Some(RefCache::Cached(value)) => Ok(value.iter().copied().collect()),
            _ => Ok(self.find_related(&entity.values, assoc, target)),
        }
    }

    /// Target entities whose other-key members equal the source's this-key
    /// values. A partially set key matches nothing.
    pub(crate) fn find_related(
        &self,
        values: &Attributes,
        assoc: &AssociationDef,
        target: &EntityTypeDef,
    ) -> Vec<EntityId> {
        let mut wanted = Vec::with_capacity(assoc.this_keys.len());
        for member in &assoc.this_keys {
            match values.get(member) {
                Some(value) if !value.is_null() => wanted.push(value.clone()),
                _ => return Vec::new(),
            }
        }
        let Some(set) = self.sets.get(&target.id) else {
            return Vec::new();
        };

        if assoc.other_keys == target.key_members {
            return set.find(&EntityKey::new(wanted)).into_iter().collect();
        }
        set.iter()
            .filter(|candidate| {
                self.entities.get(candidate).is_some_and(|e| {
                    assoc
                        .other_keys
                        .iter()
                        .zip(&wanted)
                        .all(|(member, value)| e.values.get(member) == Some(value))
                })
            })
            .collect()
    }

    // ==================== Internals ====================

    pub(crate) fn finish<T>(&mut self, result: GraphResult<T>) -> GraphResult<T> {
        self.observers.flush();
        result
    }

    pub(crate) fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId::new(self.next_id)
    }

    pub(crate) fn entity_ref(&self, id: EntityId) -> GraphResult<&Entity> {
        self.entities.get(&id).ok_or(GraphError::EntityNotFound(id))
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> GraphResult<&mut Entity> {
        self.entities
            .get_mut(&id)
            .ok_or(GraphError::EntityNotFound(id))
    }

    pub(crate) fn ensure_set(&mut self, type_def: &EntityTypeDef) -> &mut EntitySet {
        self.sets
            .entry(type_def.id)
            .or_insert_with(|| EntitySet::new(type_def.id, type_def.name.clone()))
    }

    fn set_mut(&mut self, type_id: TypeId) -> GraphResult<&mut EntitySet> {
        self.sets
            .get_mut(&type_id)
            .ok_or_else(|| GraphError::invalid_operation(format!("no set for type {}", type_id)))
    }

    pub(crate) fn set_state(&mut self, id: EntityId, state: EntityState) -> GraphResult<()> {
        let entity = self.entity_mut(id)?;
        let from = entity.state;
        if from == state {
            return Ok(());
        }
        entity.state = state;
        self.observers.emit(ChangeEvent::StateChanged {
            entity: id,
            from,
            to: state,
        });
        Ok(())
    }

    /// Add a detached entity to its set as New (`add`) or Unmodified
    /// (`attach`), together with the detached entities it refers to.
    pub(crate) fn add_entity(
        &mut self,
        type_id: TypeId,
        id: EntityId,
        state: EntityState,
    ) -> GraphResult<()> {
        let registry = Arc::clone(&self.registry);
        let type_def = type_by_id(&registry, type_id)?;
        let entity = self.entity_ref(id)?;
        if entity.type_id != type_id {
            return Err(wrong_type(&registry, entity, type_def));
        }
        if state == EntityState::New && !type_def.permits(EntitySetOperations::ADD) {
            return Err(GraphError::not_supported(&type_def.name, "Add"));
        }

        let key = EntityKey::from_members(&entity.values, &type_def.key_members);
        match entity.state {
            EntityState::Detached => {}
            EntityState::Deleted if state == EntityState::New => {
                return self.restore_deleted(type_id, id);
            }
            _ => return Err(GraphError::duplicate_key(&type_def.name, key)),
        }
        let related = self.detached_related(entity);

        let set = self.ensure_set(type_def);
        set.index(id, key)?;
        set.insert_live(id);
        if state == EntityState::Unmodified {
            self.entity_mut(id)?.original = None;
        }
        self.set_state(id, state)?;
        debug!(entity = %id, type_name = %type_def.name, %state, "entity joined set");
        self.observers
            .emit(ChangeEvent::set(type_id, CollectionAction::Add, vec![id]));

        for related_id in related {
            let related = self.entity_ref(related_id)?;
            if related.state == EntityState::Detached {
                let related_type = related.type_id;
                self.add_entity(related_type, related_id, state)?;
            }
        }

        self.activate_caches(id, type_def)?;
        self.notify_set(type_id, &SetChange::Added(vec![id]))
    }

    fn restore_deleted(&mut self, type_id: TypeId, id: EntityId) -> GraphResult<()> {
        self.set_mut(type_id)?.insert_live(id);
        let state = if self.entity_ref(id)?.original.is_some() {
            EntityState::Modified
        } else {
            EntityState::Unmodified
        };
        self.set_state(id, state)?;
        debug!(entity = %id, %state, "deleted entity restored");
        self.observers
            .emit(ChangeEvent::set(type_id, CollectionAction::Add, vec![id]));
        self.notify_set(type_id, &SetChange::Added(vec![id]))
    }

    /// Detached entities reachable through cached references and explicit
    /// collection members.
    fn detached_related(&self, entity: &Entity) -> Vec<EntityId> {
        let referenced = entity.refs.values().filter_map(|cache| match cache {
            RefCache::Cached(Some(target)) => Some(*target),
            _ => None,
        });
        let children = entity
            .collections
            .values()
            .flat_map(|cache| cache.explicit.iter().copied());

        referenced
            .chain(children)
            .filter(|related| {
                self.entities
                    .get(related)
                    .is_some_and(|e| e.state == EntityState::Detached)
            })
            .collect()
    }

    /// An entity that just joined a set re-resolves its references and
    /// repopulates the collections it already had or that are observed.
    fn activate_caches(&mut self, id: EntityId, type_def: &EntityTypeDef) -> GraphResult<()> {
        for cache in self.entity_mut(id)?.refs.values_mut() {
            cache.invalidate();
        }
        let entity = self.entity_ref(id)?;
        let collections: Vec<String> = type_def
            .associations
            .values()
            .filter(|a| a.is_collection())
            .filter(|a| entity.collections.contains_key(&a.name) || self.observers.watches(id, &a.name))
            .map(|a| a.name.clone())
            .collect();
        for name in collections {
            self.recompute_collection(id, &name)?;
        }
        Ok(())
    }

    pub(crate) fn remove_entity(&mut self, type_id: TypeId, id: EntityId) -> GraphResult<()> {
        let registry = Arc::clone(&self.registry);
        let type_def = type_by_id(&registry, type_id)?;
        let Some(entity) = self.entities.get(&id) else {
            return Ok(());
        };
        if entity.type_id != type_id || !entity.is_live() {
            return Ok(());
        }
        if entity.state == EntityState::New {
            return self.detach_entity(type_id, id);
        }
        if !type_def.permits(EntitySetOperations::REMOVE) {
            return Err(GraphError::not_supported(&type_def.name, "Remove"));
        }

        self.set_mut(type_id)?.mark_deleted(id);
        self.set_state(id, EntityState::Deleted)?;
        debug!(entity = %id, type_name = %type_def.name, "entity marked deleted");
        self.observers
            .emit(ChangeEvent::set(type_id, CollectionAction::Remove, vec![id]));
        self.notify_set(type_id, &SetChange::Removed(vec![id]))
    }

    pub(crate) fn detach_entity(&mut self, type_id: TypeId, id: EntityId) -> GraphResult<()> {
        let Some(entity) = self.entities.get(&id) else {
            return Ok(());
        };
        if entity.type_id != type_id || entity.state == EntityState::Detached {
            return Ok(());
        }

        let was_live = self.set_mut(type_id)?.remove(id);
        self.set_state(id, EntityState::Detached)?;
        self.entity_mut(id)?.original = None;
        let removed = self.subscriptions.unsubscribe_source(id);
        debug!(entity = %id, subscriptions = removed, "entity detached");

        if was_live {
            self.observers
                .emit(ChangeEvent::set(type_id, CollectionAction::Remove, vec![id]));
            self.notify_set(type_id, &SetChange::Removed(vec![id]))?;
        }
        Ok(())
    }

    pub(crate) fn clear_set(&mut self, type_id: TypeId) -> GraphResult<()> {
        let (live, deleted) = self.set_mut(type_id)?.take_all();
        for id in live.iter().chain(&deleted) {
            self.set_state(*id, EntityState::Detached)?;
            self.entity_mut(*id)?.original = None;
            self.subscriptions.unsubscribe_source(*id);
        }
        debug!(type_id = %type_id, count = live.len() + deleted.len(), "set cleared");

        self.observers
            .emit(ChangeEvent::set(type_id, CollectionAction::Reset, live.clone()));
        self.notify_set(type_id, &SetChange::Cleared(live))
    }

    /// Dispatch a structural change of the set of `target` to every cache
    /// subscribed to it.
    pub(crate) fn notify_set(&mut self, target: TypeId, change: &SetChange) -> GraphResult<()> {
        let subscribers = self.subscriptions.subscribers(target);
        if subscribers.is_empty() {
            return Ok(());
        }
        trace!(target = %target, subscribers = subscribers.len(), ?change, "dispatching set change");

        let registry = Arc::clone(&self.registry);
        for subscription in subscribers {
            let Some(source) = self.entities.get(&subscription.source) else {
                continue;
            };
            let Some(assoc) = registry.get_association(source.type_id, &subscription.association)
            else {
                continue;
            };
            if assoc.is_collection() {
                self.on_collection_target_changed(&subscription, assoc, change)?;
            } else {
                self.on_reference_target_changed(&subscription, assoc, change);
            }
        }
        Ok(())
    }

    /// Write one member and propagate the change. Returns false when the
    /// value was already equal.
    pub(crate) fn write_member(
        &mut self,
        id: EntityId,
        member: &str,
        value: Value,
        origin: WriteOrigin<'_>,
    ) -> GraphResult<bool> {
        let registry = Arc::clone(&self.registry);
        let entity = self.entity_ref(id)?;
        let type_def = type_by_id(&registry, entity.type_id)?;
        let def = type_def
            .get_member(member)
            .ok_or_else(|| GraphError::unknown_member(&type_def.name, member))?;
        check_value(type_def, def, &value)?;

        if origin != WriteOrigin::Store {
            if def.read_only && origin == WriteOrigin::Caller {
                return Err(GraphError::ReadOnlyMember {
                    type_name: type_def.name.clone(),
                    member: member.to_string(),
                });
            }
            match entity.state {
                EntityState::Deleted => {
                    return Err(GraphError::invalid_state(
                        id,
                        entity.state,
                        "deleted entities cannot be edited",
                    ));
                }
                EntityState::Unmodified | EntityState::Modified
                    if !type_def.permits(EntitySetOperations::EDIT) =>
                {
                    return Err(GraphError::not_supported(&type_def.name, "Edit"));
                }
                _ => {}
            }
        }
        if entity.values.get(member) == Some(&value) {
            return Ok(false);
        }

        if type_def.is_key_member(member) && entity.is_attached() {
            let mut next = entity.values.clone();
            next.insert(member.to_string(), value.clone());
            let key = EntityKey::from_members(&next, &type_def.key_members);
            self.set_mut(type_def.id)?.reindex(id, key)?;
        }

        let entity = self.entity_mut(id)?;
        let begins_edit = origin != WriteOrigin::Store && entity.state == EntityState::Unmodified;
        if begins_edit {
            entity.original = Some(entity.values.clone());
        }
        entity.values.insert(member.to_string(), value);
        self.observers.emit(ChangeEvent::property(id, member));
        if begins_edit {
            self.set_state(id, EntityState::Modified)?;
        }

        self.after_member_changed(id, type_def, member, origin)?;
        Ok(true)
    }

    fn after_member_changed(
        &mut self,
        id: EntityId,
        type_def: &EntityTypeDef,
        member: &str,
        origin: WriteOrigin<'_>,
    ) -> GraphResult<()> {
        if !self.entity_ref(id)?.is_attached() {
            return Ok(());
        }
        for assoc in type_def.associations_using(member) {
            if origin == WriteOrigin::Association(assoc.name.as_str()) {
                continue;
            }
            if assoc.is_collection() {
                let loaded = self
                    .entity_ref(id)?
                    .collections
                    .get(&assoc.name)
                    .is_some_and(|c| c.loaded);
                if loaded {
                    self.recompute_collection(id, &assoc.name)?;
                }
            } else {
                self.invalidate_reference(id, &assoc.name)?;
            }
        }
        self.notify_set(
            type_def.id,
            &SetChange::MemberChanged {
                entity: id,
                member: member.to_string(),
            },
        )
    }
}

/// Mutable handle on one entity set.
pub struct EntitySetMut<'a> {
    container: &'a mut EntityContainer,
    type_id: TypeId,
}

impl EntitySetMut<'_> {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Read-only view of the set.
    pub fn view(&self) -> &EntitySet {
        &self.container.sets[&self.type_id]
    }

    pub fn len(&self) -> usize {
        self.view().len()
    }

    pub fn is_empty(&self) -> bool {
        self.view().is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.view().contains(id)
    }

    /// Add a new entity, pending insert. Re-adding a Deleted member
    /// restores it.
    pub fn add(&mut self, id: EntityId) -> GraphResult<()> {
        let result = self.container.add_entity(self.type_id, id, EntityState::New);
        self.container.finish(result)
    }

    /// Attach an entity as Unmodified.
    pub fn attach(&mut self, id: EntityId) -> GraphResult<()> {
        let result = self
            .container
            .add_entity(self.type_id, id, EntityState::Unmodified);
        self.container.finish(result)
    }

    /// Remove an entity: New entities are detached, others are marked
    /// Deleted pending submission. Non-members are ignored.
    pub fn remove(&mut self, id: EntityId) -> GraphResult<()> {
        let result = self.container.remove_entity(self.type_id, id);
        self.container.finish(result)
    }

    /// Stop tracking an entity without recording a delete. Non-members are
    /// ignored.
    pub fn detach(&mut self, id: EntityId) -> GraphResult<()> {
        let result = self.container.detach_entity(self.type_id, id);
        self.container.finish(result)
    }

    /// Detach every member with one reset notification.
    pub fn clear(&mut self) -> GraphResult<()> {
        let result = self.container.clear_set(self.type_id);
        self.container.finish(result)
    }
}

// ==================== Schema Helpers ====================

pub(crate) fn type_by_id(registry: &Registry, type_id: TypeId) -> GraphResult<&EntityTypeDef> {
    registry
        .get_type(type_id)
        .ok_or_else(|| GraphError::unknown_type(type_id.to_string()))
}

/// Resolve an association of `entity` together with its source and target
/// types.
pub(crate) fn association<'r>(
    registry: &'r Registry,
    entity: &Entity,
    name: &str,
    multiplicity: Option<Multiplicity>,
) -> GraphResult<(&'r EntityTypeDef, &'r AssociationDef, &'r EntityTypeDef)> {
    let source = type_by_id(registry, entity.type_id)?;
    let assoc = source
        .get_association(name)
        .filter(|a| multiplicity.map_or(true, |m| a.multiplicity == m))
        .ok_or_else(|| GraphError::unknown_association(&source.name, name))?;
    let target = registry
        .association_target(assoc)
        .ok_or_else(|| GraphError::unknown_type(&assoc.target_type))?;
    Ok((source, assoc, target))
}

pub(crate) fn wrong_type(registry: &Registry, entity: &Entity, expected: &EntityTypeDef) -> GraphError {
    let actual = registry
        .get_type(entity.type_id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| entity.type_id.to_string());
    GraphError::WrongEntityType {
        entity: entity.id,
        expected: expected.name.clone(),
        actual,
    }
}

fn check_value(type_def: &EntityTypeDef, def: &MemberDef, value: &Value) -> GraphResult<()> {
    if def.accepts(value) {
        return Ok(());
    }
    match value.kind() {
        None => Err(GraphError::NotNullable {
            type_name: type_def.name.clone(),
            member: def.name.clone(),
        }),
        Some(kind) => Err(GraphError::TypeMismatch {
            member: def.name.clone(),
            expected: def.kind.to_string(),
            actual: kind.to_string(),
        }),
    }
}

/// Validate supplied values and fill in the omitted members.
pub(crate) fn complete_values(type_def: &EntityTypeDef, values: Attributes) -> GraphResult<Attributes> {
    for (name, value) in &values {
        let def = type_def
            .get_member(name)
            .ok_or_else(|| GraphError::unknown_member(&type_def.name, name))?;
        check_value(type_def, def, value)?;
    }
    let mut complete = values;
    for def in type_def.members.values() {
        complete
            .entry(def.name.clone())
            .or_insert_with(|| def.initial_value());
    }
    Ok(complete)
}
