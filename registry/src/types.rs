//! Schema definition types.

use bitflags::bitflags;
use indexmap::IndexMap;
use tether_core::{TypeId, Value, ValueKind};

/// Member definition within an entity type.
#[derive(Debug, Clone)]
pub struct MemberDef {
    /// Member name.
    pub name: String,
    /// Declared value kind.
    pub kind: ValueKind,
    /// Whether this member can be null.
    pub nullable: bool,
    /// Whether this member is computed by the server and cannot be edited.
    pub read_only: bool,
    /// Value used when a new or loaded entity omits the member.
    pub default: Option<Value>,
}

impl MemberDef {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            read_only: false,
            default: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// The value a member starts with when nothing was supplied.
    pub fn initial_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }

    /// Check that `value` may be stored in this member.
    pub fn accepts(&self, value: &Value) -> bool {
        match value.kind() {
            None => self.nullable,
            Some(kind) => kind == self.kind,
        }
    }
}

/// Whether an association resolves to one entity or to many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    /// Singleton reference ("Ref").
    One,
    /// Multi-valued view of the target set ("Collection").
    Many,
}

/// Association definition: a foreign-key-derived relationship from this
/// type to a target type.
///
/// `this_keys[i]` on the source must equal `other_keys[i]` on the target.
#[derive(Debug, Clone)]
pub struct AssociationDef {
    /// Association (property) name.
    pub name: String,
    /// Target entity type name.
    pub target_type: String,
    /// Members on this type.
    pub this_keys: Vec<String>,
    /// Members on the target type.
    pub other_keys: Vec<String>,
    /// True when this side holds the foreign key.
    pub is_foreign_key: bool,
    pub multiplicity: Multiplicity,
    /// For collections: adding a child writes the child's foreign key.
    pub insertion_implies_association: bool,
}

impl AssociationDef {
    /// A singleton association.
    pub fn reference(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self::new(name, target_type, Multiplicity::One)
    }

    /// A multi-valued association.
    pub fn collection(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self::new(name, target_type, Multiplicity::Many)
    }

    fn new(name: impl Into<String>, target_type: impl Into<String>, multiplicity: Multiplicity) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            this_keys: Vec::new(),
            other_keys: Vec::new(),
            is_foreign_key: false,
            multiplicity,
            insertion_implies_association: false,
        }
    }

    /// Add a this-key -> other-key pair.
    pub fn key_pair(mut self, this_key: impl Into<String>, other_key: impl Into<String>) -> Self {
        self.this_keys.push(this_key.into());
        self.other_keys.push(other_key.into());
        self
    }

    /// Mark this side as the one holding the foreign key.
    pub fn foreign_key(mut self) -> Self {
        self.is_foreign_key = true;
        self
    }

    pub fn insertion_implies_association(mut self) -> Self {
        self.insertion_implies_association = true;
        self
    }

    pub fn is_collection(&self) -> bool {
        self.multiplicity == Multiplicity::Many
    }

    /// Key pairs in declaration order.
    pub fn key_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.this_keys
            .iter()
            .map(String::as_str)
            .zip(self.other_keys.iter().map(String::as_str))
    }
}

bitflags! {
    /// Operations an entity set permits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntitySetOperations: u8 {
        const ADD = 0b001;
        const EDIT = 0b010;
        const REMOVE = 0b100;
        const ALL = Self::ADD.bits() | Self::EDIT.bits() | Self::REMOVE.bits();
    }
}

impl Default for EntitySetOperations {
    fn default() -> Self {
        Self::ALL
    }
}

/// Entity type definition.
#[derive(Debug, Clone)]
pub struct EntityTypeDef {
    /// Unique identifier.
    pub id: TypeId,
    /// Type name.
    pub name: String,
    /// Key members in key-tuple order.
    pub key_members: Vec<String>,
    /// Member definitions in declaration order.
    pub members: IndexMap<String, MemberDef>,
    /// Association definitions in declaration order.
    pub associations: IndexMap<String, AssociationDef>,
    /// Operations the set of this type permits.
    pub operations: EntitySetOperations,
}

impl EntityTypeDef {
    pub fn new(id: TypeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            key_members: Vec::new(),
            members: IndexMap::new(),
            associations: IndexMap::new(),
            operations: EntitySetOperations::ALL,
        }
    }

    /// Get a member definition by name.
    pub fn get_member(&self, name: &str) -> Option<&MemberDef> {
        self.members.get(name)
    }

    /// Check if this type has a member.
    pub fn has_member(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn is_key_member(&self, name: &str) -> bool {
        self.key_members.iter().any(|k| k == name)
    }

    /// Get an association definition by name.
    pub fn get_association(&self, name: &str) -> Option<&AssociationDef> {
        self.associations.get(name)
    }

    /// Associations whose this-side members include `member`.
    pub fn associations_using(&self, member: &str) -> impl Iterator<Item = &AssociationDef> + '_ {
        let member = member.to_string();
        self.associations
            .values()
            .filter(move |a| a.this_keys.contains(&member))
    }

    pub fn permits(&self, operation: EntitySetOperations) -> bool {
        self.operations.contains(operation)
    }
}
