//! Tether Core Types
//!
//! This crate provides the foundational types used throughout Tether:
//! - Identity types (EntityId, TypeId) and composite entity keys
//! - Value types (the Value enum with all scalar member types)
//! - Change-state tracking (EntityState)
//! - Validation and remote fault records shared by sets and operations
//! - Common error types

mod error;
mod id;
mod key;
mod result;
mod state;
mod value;

pub use error::*;
pub use id::*;
pub use key::*;
pub use result::*;
pub use state::*;
pub use value::*;
