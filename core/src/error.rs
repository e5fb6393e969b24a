//! Common error types for Tether.

use crate::{EntityId, EntityKey, EntityState};
use thiserror::Error;

/// Errors raised synchronously by entity sets, the container and
/// association caches. These are programming errors, not runtime faults.
#[derive(Debug, Error)]
pub enum GraphError {
    /// An entity with the same key is already tracked by the set.
    #[error("An entity of type {type_name} with key {key} already exists in the set")]
    DuplicateKey { type_name: String, key: EntityKey },

    /// Entity not found in the container.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Entity type not declared in the registry.
    #[error("Unknown entity type: {0}")]
    UnknownType(String),

    /// Member not declared on the entity type.
    #[error("Unknown member: {member} on type {type_name}")]
    UnknownMember { type_name: String, member: String },

    /// Association not declared on the entity type.
    #[error("Unknown association: {association} on type {type_name}")]
    UnknownAssociation {
        type_name: String,
        association: String,
    },

    /// Entity used with a set of a different type.
    #[error("Entity {entity} is of type {actual}, expected {expected}")]
    WrongEntityType {
        entity: EntityId,
        expected: String,
        actual: String,
    },

    /// Value does not match the declared member kind.
    #[error("Type mismatch for {member}: expected {expected}, got {actual}")]
    TypeMismatch {
        member: String,
        expected: String,
        actual: String,
    },

    /// Null written to a non-nullable member.
    #[error("Member {member} on type {type_name} is not nullable")]
    NotNullable { type_name: String, member: String },

    /// Caller wrote a server-computed member.
    #[error("Member {member} on type {type_name} is read-only")]
    ReadOnlyMember { type_name: String, member: String },

    /// The set does not permit the requested operation.
    #[error("{operation} is not supported on the {type_name} set")]
    OperationNotSupported {
        type_name: String,
        operation: &'static str,
    },

    /// Entity is in a state that forbids the operation.
    #[error("Entity {entity} is {state}: {message}")]
    InvalidEntityState {
        entity: EntityId,
        state: EntityState,
        message: String,
    },

    /// Invalid operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl GraphError {
    pub fn duplicate_key(type_name: impl Into<String>, key: EntityKey) -> Self {
        Self::DuplicateKey {
            type_name: type_name.into(),
            key,
        }
    }

    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType(name.into())
    }

    pub fn unknown_member(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self::UnknownMember {
            type_name: type_name.into(),
            member: member.into(),
        }
    }

    pub fn unknown_association(
        type_name: impl Into<String>,
        association: impl Into<String>,
    ) -> Self {
        Self::UnknownAssociation {
            type_name: type_name.into(),
            association: association.into(),
        }
    }

    pub fn not_supported(type_name: impl Into<String>, operation: &'static str) -> Self {
        Self::OperationNotSupported {
            type_name: type_name.into(),
            operation,
        }
    }

    pub fn invalid_state(entity: EntityId, state: EntityState, message: impl Into<String>) -> Self {
        Self::InvalidEntityState {
            entity,
            state,
            message: message.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
