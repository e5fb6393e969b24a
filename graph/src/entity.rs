//! Entities tracked by the container.

use crate::collection::CollectionCache;
use crate::reference::RefCache;
use std::collections::{BTreeSet, HashMap};
use tether_core::{Attributes, EntityId, EntityState, TypeId, ValidationResult, Value};

/// Concurrency conflict reported by the server for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityConflict {
    /// Client values at submit time.
    pub current: Attributes,
    /// Client original snapshot at submit time.
    pub original: Option<Attributes>,
    /// Values currently held by the server; `None` when deleted there.
    pub store: Option<Attributes>,
    /// Members whose store value differs from the original.
    pub members: BTreeSet<String>,
    /// The entity no longer exists on the server.
    pub is_deleted: bool,
}

/// An entity instance: typed member values plus change tracking.
///
/// Entities live in the container's arena and are addressed by
/// [`EntityId`]. Set membership and cached associations are maintained by
/// the container.
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) id: EntityId,
    pub(crate) type_id: TypeId,
    pub(crate) state: EntityState,
    pub(crate) values: Attributes,
    pub(crate) original: Option<Attributes>,
    pub(crate) refs: HashMap<String, RefCache>,
    pub(crate) collections: HashMap<String, CollectionCache>,
    pub(crate) validation_errors: Vec<ValidationResult>,
    pub(crate) conflict: Option<EntityConflict>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, type_id: TypeId, values: Attributes) -> Self {
        Self {
            id,
            type_id,
            state: EntityState::Detached,
            values,
            original: None,
            refs: HashMap::new(),
            collections: HashMap::new(),
            validation_errors: Vec::new(),
            conflict: None,
        }
    }

    /// True when a resolved reference or a collection cache points at `other`.
    pub(crate) fn refers_to(&self, other: EntityId) -> bool {
        self.refs
            .values()
            .any(|cache| matches!(cache, RefCache::Cached(Some(target)) if *target == other))
            || self
                .collections
                .values()
                .any(|cache| cache.view.contains(&other) || cache.explicit.contains(&other))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Get a member value.
    pub fn get(&self, member: &str) -> Option<&Value> {
        self.values.get(member)
    }

    /// All current member values.
    pub fn values(&self) -> &Attributes {
        &self.values
    }

    /// Snapshot taken at the first edit since the last accept.
    pub fn original(&self) -> Option<&Attributes> {
        self.original.as_ref()
    }

    /// Original value of a member, falling back to the current value when
    /// the entity is unedited.
    pub fn original_value(&self, member: &str) -> Option<&Value> {
        match &self.original {
            Some(original) => original.get(member),
            None => self.values.get(member),
        }
    }

    /// Members whose current value differs from the original snapshot.
    pub fn modified_members(&self) -> Vec<&str> {
        let Some(original) = &self.original else {
            return Vec::new();
        };
        self.values
            .iter()
            .filter(|(name, value)| original.get(name.as_str()) != Some(*value))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn has_changes(&self) -> bool {
        self.state.has_changes()
    }

    /// True while the entity is tracked by a set (including Deleted).
    pub fn is_attached(&self) -> bool {
        self.state != EntityState::Detached
    }

    // ==================== Validation ====================

    /// Pending validation errors applied by the last submit.
    pub fn validation_errors(&self) -> &[ValidationResult] {
        &self.validation_errors
    }

    pub fn has_validation_errors(&self) -> bool {
        !self.validation_errors.is_empty()
    }

    /// Errors that name no member.
    pub fn entity_errors(&self) -> impl Iterator<Item = &ValidationResult> {
        self.validation_errors.iter().filter(|r| r.is_entity_level())
    }

    /// Errors that name `member`.
    pub fn member_errors<'a>(&'a self, member: &'a str) -> impl Iterator<Item = &'a ValidationResult> {
        self.validation_errors
            .iter()
            .filter(move |r| r.applies_to(member))
    }

    pub fn conflict(&self) -> Option<&EntityConflict> {
        self.conflict.as_ref()
    }

    pub(crate) fn is_live(&self) -> bool {
        matches!(
            self.state,
            EntityState::New | EntityState::Unmodified | EntityState::Modified
        )
    }
}
