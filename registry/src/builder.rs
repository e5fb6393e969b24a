//! RegistryBuilder for constructing an immutable Registry.

use crate::{AssociationDef, EntitySetOperations, EntityTypeDef, MemberDef, Registry};
use indexmap::IndexMap;
use std::collections::HashMap;
use tether_core::TypeId;
use thiserror::Error;

/// Errors that can occur during registry construction.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate type name: {0}")]
    DuplicateTypeName(String),

    #[error("Duplicate member {member} on type {type_name}")]
    DuplicateMember { type_name: String, member: String },

    #[error("Duplicate association {association} on type {type_name}")]
    DuplicateAssociation {
        type_name: String,
        association: String,
    },

    #[error("Type {0} declares no key members")]
    MissingKey(String),

    #[error("Unknown target type {target} for association {type_name}.{association}")]
    UnknownTargetType {
        type_name: String,
        association: String,
        target: String,
    },

    #[error("Association {type_name}.{association} references unknown member {member}")]
    UnknownAssociationMember {
        type_name: String,
        association: String,
        member: String,
    },

    #[error("Association {type_name}.{association} must pair at least one key and pair them one to one")]
    KeyArityMismatch {
        type_name: String,
        association: String,
    },
}

/// Builder for constructing an immutable Registry.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    /// Next type ID to allocate.
    next_type_id: u32,
    /// Types being built.
    types: HashMap<TypeId, EntityTypeDef>,
    /// Type name to ID mapping.
    type_names: HashMap<String, TypeId>,
    /// Declaration order.
    order: Vec<TypeId>,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity type definition.
    pub fn add_type(&mut self, name: impl Into<String>) -> TypeBuilder<'_> {
        let name = name.into();
        let id = TypeId::new(self.next_type_id);
        self.next_type_id += 1;

        TypeBuilder {
            builder: self,
            id,
            name,
            key_members: Vec::new(),
            members: IndexMap::new(),
            associations: IndexMap::new(),
            operations: EntitySetOperations::ALL,
            duplicate: None,
        }
    }

    /// Build the immutable Registry.
    ///
    /// Associations are validated here, once every type is known, so types
    /// may reference each other in any declaration order.
    pub fn build(self) -> Result<Registry, RegistryError> {
        for type_def in self.types.values() {
            for assoc in type_def.associations.values() {
                let target = self
                    .type_names
                    .get(&assoc.target_type)
                    .and_then(|id| self.types.get(id))
                    .ok_or_else(|| RegistryError::UnknownTargetType {
                        type_name: type_def.name.clone(),
                        association: assoc.name.clone(),
                        target: assoc.target_type.clone(),
                    })?;

                if assoc.this_keys.is_empty() || assoc.this_keys.len() != assoc.other_keys.len() {
                    return Err(RegistryError::KeyArityMismatch {
                        type_name: type_def.name.clone(),
                        association: assoc.name.clone(),
                    });
                }

                let unknown = assoc
                    .this_keys
                    .iter()
                    .find(|m| !type_def.has_member(m))
                    .or_else(|| assoc.other_keys.iter().find(|m| !target.has_member(m)));
                if let Some(member) = unknown {
                    return Err(RegistryError::UnknownAssociationMember {
                        type_name: type_def.name.clone(),
                        association: assoc.name.clone(),
                        member: member.clone(),
                    });
                }
            }
        }

        Ok(Registry::new(self.types, self.type_names, self.order))
    }
}

/// Builder for an entity type definition.
pub struct TypeBuilder<'a> {
    builder: &'a mut RegistryBuilder,
    id: TypeId,
    name: String,
    key_members: Vec<String>,
    members: IndexMap<String, MemberDef>,
    associations: IndexMap<String, AssociationDef>,
    operations: EntitySetOperations,
    duplicate: Option<RegistryError>,
}

impl<'a> TypeBuilder<'a> {
    /// Add a key member. Key members form the identity tuple in the order
    /// they are declared.
    pub fn key(mut self, member: MemberDef) -> Self {
        self.key_members.push(member.name.clone());
        self.member(member)
    }

    /// Add a member.
    pub fn member(mut self, member: MemberDef) -> Self {
        if self.members.contains_key(&member.name) {
            self.duplicate.get_or_insert(RegistryError::DuplicateMember {
                type_name: self.name.clone(),
                member: member.name.clone(),
            });
        }
        self.members.insert(member.name.clone(), member);
        self
    }

    /// Add an association (singleton or collection).
    pub fn association(mut self, association: AssociationDef) -> Self {
        if self.associations.contains_key(&association.name) {
            self.duplicate.get_or_insert(RegistryError::DuplicateAssociation {
                type_name: self.name.clone(),
                association: association.name.clone(),
            });
        }
        self.associations
            .insert(association.name.clone(), association);
        self
    }

    /// Restrict the operations the set of this type permits.
    pub fn operations(mut self, operations: EntitySetOperations) -> Self {
        self.operations = operations;
        self
    }

    /// Finish building this type.
    pub fn done(self) -> Result<TypeId, RegistryError> {
        if let Some(err) = self.duplicate {
            return Err(err);
        }

        // Check for duplicate name
        if self.builder.type_names.contains_key(&self.name) {
            return Err(RegistryError::DuplicateTypeName(self.name));
        }

        if self.key_members.is_empty() {
            return Err(RegistryError::MissingKey(self.name));
        }

        let type_def = EntityTypeDef {
            id: self.id,
            name: self.name.clone(),
            key_members: self.key_members,
            members: self.members,
            associations: self.associations,
            operations: self.operations,
        };

        self.builder.type_names.insert(self.name, self.id);
        self.builder.types.insert(self.id, type_def);
        self.builder.order.push(self.id);

        Ok(self.id)
    }
}
