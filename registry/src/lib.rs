//! Tether Registry
//!
//! Runtime schema lookup. Single source of truth for entity types, their
//! members, key members and associations. The registry is immutable after
//! construction via RegistryBuilder.

mod builder;
mod registry;
mod types;

pub use builder::{RegistryBuilder, RegistryError, TypeBuilder};
pub use registry::Registry;
pub use types::*;
