//! Changeset entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tether_core::{Attributes, EntityId};

/// What the server is asked to do with one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityOperation {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for EntityOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "Insert",
            Self::Update => "Update",
            Self::Delete => "Delete",
        };
        f.write_str(name)
    }
}

/// One entity's change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSetEntry {
    /// Position-independent id, referenced by association edges and by
    /// the server's results.
    pub id: usize,
    pub entity: EntityId,
    pub type_name: String,
    pub operation: EntityOperation,
    pub current: Attributes,
    /// Values last accepted by the server; absent for inserts.
    pub original: Option<Attributes>,
    /// Association name -> ids of related entries in this changeset.
    pub associations: BTreeMap<String, Vec<usize>>,
}

/// Ordered entries: inserts (parents first), updates, then deletes
/// (children first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub(crate) entries: Vec<ChangeSetEntry>,
}

impl ChangeSet {
    pub fn entries(&self) -> &[ChangeSetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: usize) -> Option<&ChangeSetEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entry_for(&self, entity: EntityId) -> Option<&ChangeSetEntry> {
        self.entries.iter().find(|e| e.entity == entity)
    }

    /// Entities with the given operation, in entry order.
    pub fn entities(&self, operation: EntityOperation) -> impl Iterator<Item = EntityId> + '_ {
        self.entries
            .iter()
            .filter(move |e| e.operation == operation)
            .map(|e| e.entity)
    }
}
