//! Per-type entity sets.
//!
//! A set indexes its members by key tuple and keeps two ordered lists: the
//! live members (enumeration order) and the members marked Deleted pending
//! submission. Deleted members keep their key slot so a new entity cannot
//! claim it until the delete is accepted.

use indexmap::IndexSet;
use std::collections::HashMap;
use tether_core::{EntityId, EntityKey, GraphError, GraphResult, TypeId};

/// The members of one entity type within a container.
#[derive(Debug, Clone)]
pub struct EntitySet {
    type_id: TypeId,
    type_name: String,
    /// Key tuple -> entity, for live and Deleted members with complete keys.
    identity: HashMap<EntityKey, EntityId>,
    /// Reverse of `identity`.
    keys: HashMap<EntityId, EntityKey>,
    live: IndexSet<EntityId>,
    deleted: IndexSet<EntityId>,
}

impl EntitySet {
    pub(crate) fn new(type_id: TypeId, type_name: impl Into<String>) -> Self {
        Self {
            type_id,
            type_name: type_name.into(),
            identity: HashMap::new(),
            keys: HashMap::new(),
            live: IndexSet::new(),
            deleted: IndexSet::new(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Number of live members.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live members in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.live.iter().copied()
    }

    /// Members marked Deleted, in removal order.
    pub fn deleted(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.deleted.iter().copied()
    }

    /// True when `id` is a live member.
    pub fn contains(&self, id: EntityId) -> bool {
        self.live.contains(&id)
    }

    /// True when `id` is tracked at all (live or Deleted).
    pub fn tracks(&self, id: EntityId) -> bool {
        self.live.contains(&id) || self.deleted.contains(&id)
    }

    /// Find a live member by key.
    pub fn find(&self, key: &EntityKey) -> Option<EntityId> {
        self.identity
            .get(key)
            .copied()
            .filter(|id| self.live.contains(id))
    }

    /// Find any tracked member by key, including Deleted ones.
    pub(crate) fn lookup(&self, key: &EntityKey) -> Option<EntityId> {
        self.identity.get(key).copied()
    }

    pub fn key_of(&self, id: EntityId) -> Option<&EntityKey> {
        self.keys.get(&id)
    }

    // ==================== Mutation ====================

    /// Claim the key slot for `id`. Incomplete keys are not indexed.
    pub(crate) fn index(&mut self, id: EntityId, key: EntityKey) -> GraphResult<()> {
        if !key.is_complete() {
            return Ok(());
        }
        match self.identity.get(&key) {
            Some(existing) if *existing != id => {
                Err(GraphError::duplicate_key(self.type_name.clone(), key))
            }
            _ => {
                self.identity.insert(key.clone(), id);
                self.keys.insert(id, key);
                Ok(())
            }
        }
    }

    /// Move `id` to a new key slot. On collision nothing changes.
    pub(crate) fn reindex(&mut self, id: EntityId, key: EntityKey) -> GraphResult<()> {
        if key.is_complete() {
            if let Some(existing) = self.identity.get(&key) {
                if *existing != id {
                    return Err(GraphError::duplicate_key(self.type_name.clone(), key));
                }
            }
        }
        self.unindex(id);
        self.index(id, key)
    }

    pub(crate) fn unindex(&mut self, id: EntityId) {
        if let Some(key) = self.keys.remove(&id) {
            self.identity.remove(&key);
        }
    }

    pub(crate) fn insert_live(&mut self, id: EntityId) {
        self.deleted.shift_remove(&id);
        self.live.insert(id);
    }

    pub(crate) fn mark_deleted(&mut self, id: EntityId) {
        self.live.shift_remove(&id);
        self.deleted.insert(id);
    }

    /// Stop tracking `id`. Returns true when it was a live member.
    pub(crate) fn remove(&mut self, id: EntityId) -> bool {
        self.unindex(id);
        self.deleted.shift_remove(&id);
        self.live.shift_remove(&id)
    }

    /// Stop tracking everything. Returns the former live members.
    pub(crate) fn take_all(&mut self) -> (Vec<EntityId>, Vec<EntityId>) {
        self.identity.clear();
        self.keys.clear();
        let live = std::mem::take(&mut self.live).into_iter().collect();
        let deleted = std::mem::take(&mut self.deleted).into_iter().collect();
        (live, deleted)
    }
}
