//! The Registry - immutable schema lookup.

use crate::{AssociationDef, EntityTypeDef};
use std::collections::HashMap;
use tether_core::TypeId;

/// The Registry provides runtime lookup of entity type definitions.
/// It is immutable after construction.
#[derive(Debug, Default)]
pub struct Registry {
    /// Entity type definitions by ID.
    types: HashMap<TypeId, EntityTypeDef>,
    /// Entity type ID lookup by name.
    type_names: HashMap<String, TypeId>,
    /// Types in declaration order.
    order: Vec<TypeId>,
}

impl Registry {
    pub(crate) fn new(
        types: HashMap<TypeId, EntityTypeDef>,
        type_names: HashMap<String, TypeId>,
        order: Vec<TypeId>,
    ) -> Self {
        Self {
            types,
            type_names,
            order,
        }
    }

    // ==================== Type Lookups ====================

    /// Get a type definition by name.
    pub fn get_type_by_name(&self, name: &str) -> Option<&EntityTypeDef> {
        self.type_names.get(name).and_then(|id| self.types.get(id))
    }

    /// Get a type definition by ID.
    pub fn get_type(&self, id: TypeId) -> Option<&EntityTypeDef> {
        self.types.get(&id)
    }

    /// Get a type ID by name.
    pub fn get_type_id(&self, name: &str) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    /// Get all type definitions in declaration order.
    pub fn all_types(&self) -> impl Iterator<Item = &EntityTypeDef> {
        self.order.iter().filter_map(|id| self.types.get(id))
    }

    /// Get the number of types.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    // ==================== Association Lookups ====================

    /// Get an association of a type by name.
    pub fn get_association(&self, type_id: TypeId, name: &str) -> Option<&AssociationDef> {
        self.types.get(&type_id)?.get_association(name)
    }

    /// Resolve the target type of an association.
    pub fn association_target(&self, association: &AssociationDef) -> Option<&EntityTypeDef> {
        self.get_type_by_name(&association.target_type)
    }
}
