//! Tether Graph
//!
//! The in-memory identity map: an [`EntityContainer`] owns every entity in an
//! arena and keeps one [`EntitySet`] per entity type. Associations are computed
//! relations between entities (key matches), cached per entity and kept
//! current through a subscription table keyed by target set.

mod collection;
mod container;
mod entity;
mod load;
mod observer;
mod reference;
mod set;
mod subscription;
mod tracking;

pub use container::{EntityContainer, EntitySetMut};
pub use entity::{Entity, EntityConflict};
pub use load::{EntityRecord, LoadBehavior};
pub use observer::{ChangeEvent, CollectionAction, CollectionSource, ObserverId, ObserverScope};
pub use set::EntitySet;
pub use tracking::EntityChangeSet;

#[cfg(test)]
pub(crate) mod test_support;
