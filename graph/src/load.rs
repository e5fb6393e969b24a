//! Loading server results into the container.

use crate::container::{complete_values, EntityContainer, SetChange, WriteOrigin};
use crate::entity::Entity;
use crate::observer::{ChangeEvent, CollectionAction};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tether_core::{
    Attributes, EntityId, EntityKey, EntityState, GraphError, GraphResult, TypeId,
};
use tether_registry::EntityTypeDef;
use tracing::{debug, trace};

/// How loaded values are merged into an entity that is already tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadBehavior {
    /// Leave tracked entities untouched.
    KeepCurrent,
    /// Overwrite unedited members, keep local edits and rebase the
    /// original snapshot onto the loaded values.
    #[default]
    MergeIntoCurrent,
    /// Overwrite everything and discard local edits.
    RefreshCurrent,
}

/// One entity as returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub type_name: String,
    pub values: Attributes,
}

impl EntityRecord {
    pub fn new(type_name: impl Into<String>, values: Attributes) -> Self {
        Self {
            type_name: type_name.into(),
            values,
        }
    }
}

impl EntityContainer {
    /// Merge a batch of records by identity. New identities are attached
    /// as Unmodified; entities deleted locally are never resurrected.
    ///
    /// Returns the tracked entity for every record that was not skipped,
    /// in record order.
    pub fn load(
        &mut self,
        records: impl IntoIterator<Item = EntityRecord>,
        behavior: LoadBehavior,
    ) -> GraphResult<Vec<EntityId>> {
        let result = self.load_records(records, behavior);
        self.finish(result)
    }

    fn load_records(
        &mut self,
        records: impl IntoIterator<Item = EntityRecord>,
        behavior: LoadBehavior,
    ) -> GraphResult<Vec<EntityId>> {
        let registry = Arc::clone(&self.registry);
        let mut attached: IndexMap<TypeId, Vec<EntityId>> = IndexMap::new();
        let mut loaded = Vec::new();

        for record in records {
            let type_def = registry
                .get_type_by_name(&record.type_name)
                .ok_or_else(|| GraphError::unknown_type(&record.type_name))?;
            let values = complete_values(type_def, record.values)?;
            let key = EntityKey::from_members(&values, &type_def.key_members);
            if !key.is_complete() {
                return Err(GraphError::invalid_operation(format!(
                    "loaded {} has incomplete key {}",
                    type_def.name, key
                )));
            }

            match self.ensure_set(type_def).lookup(&key) {
                Some(existing) => {
                    if self.entity_ref(existing)?.state == EntityState::Deleted {
                        debug!(entity = %existing, %key, "skipping loaded record for deleted entity");
                        continue;
                    }
                    self.merge_entity(type_def, existing, values, behavior)?;
                    loaded.push(existing);
                }
                None => {
                    let id = self.allocate_id();
                    let mut entity = Entity::new(id, type_def.id, values);
                    entity.state = EntityState::Unmodified;
                    self.entities.insert(id, entity);
                    let set = self.ensure_set(type_def);
                    set.index(id, key)?;
                    set.insert_live(id);
                    attached.entry(type_def.id).or_default().push(id);
                    loaded.push(id);
                }
            }
        }

        for (type_id, ids) in attached {
            debug!(type_id = %type_id, count = ids.len(), "attached loaded entities");
            self.observers
                .emit(ChangeEvent::set(type_id, CollectionAction::Add, ids.clone()));
            self.notify_set(type_id, &SetChange::Added(ids))?;
        }
        Ok(loaded)
    }

    fn merge_entity(
        &mut self,
        type_def: &EntityTypeDef,
        id: EntityId,
        store: Attributes,
        behavior: LoadBehavior,
    ) -> GraphResult<()> {
        let entity = self.entity_ref(id)?;
        let state = entity.state;
        if behavior == LoadBehavior::KeepCurrent || state == EntityState::New {
            return Ok(());
        }

        if behavior == LoadBehavior::MergeIntoCurrent && state == EntityState::Modified {
            let original = entity.original.clone().unwrap_or_default();
            let unedited: Vec<String> = store
                .keys()
                .filter(|member| original.get(*member) == entity.values.get(*member))
                .cloned()
                .collect();
            for member in unedited {
                if let Some(value) = store.get(&member) {
                    self.write_member(id, &member, value.clone(), WriteOrigin::Store)?;
                }
            }
            self.entity_mut(id)?.original = Some(store);
            trace!(entity = %id, type_name = %type_def.name, "merged loaded values into edited entity");
            return Ok(());
        }

        for (member, value) in store {
            self.write_member(id, &member, value, WriteOrigin::Store)?;
        }
        if behavior == LoadBehavior::RefreshCurrent {
            self.entity_mut(id)?.original = None;
            self.set_state(id, EntityState::Unmodified)?;
        }
        trace!(entity = %id, type_name = %type_def.name, ?behavior, "refreshed entity from load");
        Ok(())
    }
}
