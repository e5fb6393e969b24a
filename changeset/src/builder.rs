//! Building a changeset from a container's pending changes.

use crate::entry::{ChangeSet, ChangeSetEntry, EntityOperation};
use crate::error::{ChangeSetError, ChangeSetResult};
use indexmap::IndexSet;
use std::collections::{BTreeMap, HashMap, HashSet};
use tether_core::{EntityId, GraphError};
use tether_graph::{Entity, EntityContainer};
use tether_registry::EntityTypeDef;
use tracing::debug;

/// Builds a [`ChangeSet`] from a container.
pub struct ChangeSetBuilder<'a> {
    container: &'a EntityContainer,
}

impl<'a> ChangeSetBuilder<'a> {
    pub fn new(container: &'a EntityContainer) -> Self {
        Self { container }
    }

    pub fn build(self) -> ChangeSetResult<ChangeSet> {
        let changes = self.container.get_changes();

        let inserts = order_by_dependencies(&changes.added, &self.insert_dependencies(&changes.added)?);
        let deletes = order_by_dependencies(&changes.removed, &self.delete_dependencies(&changes.removed)?);

        let ordered: Vec<(EntityId, EntityOperation)> = inserts
            .into_iter()
            .map(|id| (id, EntityOperation::Insert))
            .chain(changes.modified.iter().map(|id| (*id, EntityOperation::Update)))
            .chain(deletes.into_iter().map(|id| (id, EntityOperation::Delete)))
            .collect();
        let entry_ids: HashMap<EntityId, usize> = ordered
            .iter()
            .enumerate()
            .map(|(index, (id, _))| (*id, index))
            .collect();

        let mut entries = Vec::with_capacity(ordered.len());
        for (index, (id, operation)) in ordered.into_iter().enumerate() {
            let (entity, type_def) = self.entity(id)?;
            let original = match operation {
                EntityOperation::Insert => None,
                _ => Some(entity.original().unwrap_or(entity.values()).clone()),
            };

            let mut associations = BTreeMap::new();
            for assoc in type_def.associations.values() {
                let related: Vec<usize> = self
                    .container
                    .related(id, &assoc.name)?
                    .iter()
                    .filter_map(|r| entry_ids.get(r).copied())
                    .collect();
                if !related.is_empty() {
                    associations.insert(assoc.name.clone(), related);
                }
            }

            entries.push(ChangeSetEntry {
                id: index,
                entity: id,
                type_name: type_def.name.clone(),
                operation,
                current: entity.values().clone(),
                original,
                associations,
            });
        }

        debug!(
            inserts = changes.added.len(),
            updates = changes.modified.len(),
            deletes = changes.removed.len(),
            "changeset built"
        );
        Ok(ChangeSet { entries })
    }

    fn entity(&self, id: EntityId) -> ChangeSetResult<(&'a Entity, &'a EntityTypeDef)> {
        let entity = self
            .container
            .entity(id)
            .ok_or(ChangeSetError::Graph(GraphError::EntityNotFound(id)))?;
        let type_def = self
            .container
            .registry()
            .get_type(entity.type_id())
            .ok_or_else(|| GraphError::unknown_type(entity.type_id().to_string()))?;
        Ok((entity, type_def))
    }

    /// New entity -> New entities that must be inserted before it: the
    /// targets of its foreign keys and the owners of collections it is in.
    fn insert_dependencies(
        &self,
        added: &[EntityId],
    ) -> ChangeSetResult<HashMap<EntityId, Vec<EntityId>>> {
        let pending: HashSet<EntityId> = added.iter().copied().collect();
        let mut deps: HashMap<EntityId, Vec<EntityId>> = HashMap::new();

        for id in added {
            let (_, type_def) = self.entity(*id)?;
            for assoc in type_def.associations.values() {
                let related = self.container.related(*id, &assoc.name)?;
                for other in related.into_iter().filter(|r| pending.contains(r) && r != id) {
                    if assoc.is_collection() && !assoc.is_foreign_key {
                        deps.entry(other).or_default().push(*id);
                    } else if assoc.is_foreign_key {
                        deps.entry(*id).or_default().push(other);
                    }
                }
            }
        }
        Ok(deps)
    }

    /// Deleted entity -> Deleted entities that must be deleted before it:
    /// the ones whose foreign key points at it.
    fn delete_dependencies(
        &self,
        removed: &[EntityId],
    ) -> ChangeSetResult<HashMap<EntityId, Vec<EntityId>>> {
        let mut deps: HashMap<EntityId, Vec<EntityId>> = HashMap::new();

        for child_id in removed {
            let (child, type_def) = self.entity(*child_id)?;
            for assoc in type_def
                .associations
                .values()
                .filter(|a| a.is_foreign_key && !a.is_collection())
            {
                for parent_id in removed.iter().filter(|p| *p != child_id) {
                    let (parent, parent_type) = self.entity(*parent_id)?;
                    if parent_type.name != assoc.target_type {
                        continue;
                    }
                    let matches = assoc.key_pairs().all(|(this_key, other_key)| {
                        let value = child.original_value(this_key);
                        value.is_some_and(|v| !v.is_null()) && value == parent.original_value(other_key)
                    });
                    if matches {
                        deps.entry(*parent_id).or_default().push(*child_id);
                    }
                }
            }
        }
        Ok(deps)
    }
}

/// Order `ids` so that every id comes after the ids it depends on, keeping
/// the input order otherwise. Ids caught in a cycle keep their input order
/// at the end.
fn order_by_dependencies(
    ids: &[EntityId],
    deps: &HashMap<EntityId, Vec<EntityId>>,
) -> Vec<EntityId> {
    let mut placed: IndexSet<EntityId> = IndexSet::with_capacity(ids.len());
    loop {
        let before = placed.len();
        for id in ids {
            if placed.contains(id) {
                continue;
            }
            let ready = deps
                .get(id)
                .map_or(true, |d| d.iter().all(|dep| placed.contains(dep)));
            if ready {
                placed.insert(*id);
            }
        }
        if placed.len() == before {
            break;
        }
    }
    if placed.len() < ids.len() {
        debug!(count = ids.len() - placed.len(), "dependency cycle in changeset");
        placed.extend(ids.iter().copied());
    }
    placed.into_iter().collect()
}
