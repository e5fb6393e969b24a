//! Change notifications.
//!
//! Mutations queue events while they run; the container delivers the queue
//! to matching listeners once the public call has finished its work, so a
//! listener always observes a consistent container.

use std::fmt;
use tether_core::{EntityId, EntityState, TypeId};

/// Where a collection change happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionSource {
    /// The live members of an entity set.
    Set(TypeId),
    /// The live view of a collection association.
    Association { entity: EntityId, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionAction {
    Add,
    Remove,
    /// Everything was removed at once.
    Reset,
}

/// A change to an entity or to a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A member or an association property changed.
    PropertyChanged { entity: EntityId, property: String },
    StateChanged {
        entity: EntityId,
        from: EntityState,
        to: EntityState,
    },
    CollectionChanged {
        source: CollectionSource,
        action: CollectionAction,
        items: Vec<EntityId>,
    },
}

impl ChangeEvent {
    pub(crate) fn property(entity: EntityId, property: impl Into<String>) -> Self {
        Self::PropertyChanged {
            entity,
            property: property.into(),
        }
    }

    pub(crate) fn association(
        entity: EntityId,
        name: impl Into<String>,
        action: CollectionAction,
        items: Vec<EntityId>,
    ) -> Self {
        Self::CollectionChanged {
            source: CollectionSource::Association {
                entity,
                name: name.into(),
            },
            action,
            items,
        }
    }

    pub(crate) fn set(type_id: TypeId, action: CollectionAction, items: Vec<EntityId>) -> Self {
        Self::CollectionChanged {
            source: CollectionSource::Set(type_id),
            action,
            items,
        }
    }
}

/// Which events a listener receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverScope {
    All,
    /// Property and state changes of one entity.
    Entity(EntityId),
    /// Membership changes of one set.
    Set(TypeId),
    /// Changes to the live view of one collection association.
    Association { entity: EntityId, name: String },
}

impl ObserverScope {
    fn matches(&self, event: &ChangeEvent) -> bool {
        match (self, event) {
            (ObserverScope::All, _) => true,
            (ObserverScope::Entity(id), ChangeEvent::PropertyChanged { entity, .. })
            | (ObserverScope::Entity(id), ChangeEvent::StateChanged { entity, .. }) => id == entity,
            (
                ObserverScope::Set(type_id),
                ChangeEvent::CollectionChanged {
                    source: CollectionSource::Set(source),
                    ..
                },
            ) => type_id == source,
            (
                ObserverScope::Association { entity, name },
                ChangeEvent::CollectionChanged {
                    source:
                        CollectionSource::Association {
                            entity: source,
                            name: source_name,
                        },
                    ..
                },
            ) => entity == source && name == source_name,
            _ => false,
        }
    }
}

/// Handle returned by `observe`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Listener = Box<dyn FnMut(&ChangeEvent)>;

/// Registered listeners plus the queue of undelivered events.
#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    listeners: Vec<(ObserverId, ObserverScope, Listener)>,
    pending: Vec<ChangeEvent>,
}

impl Observers {
    pub(crate) fn add(&mut self, scope: ObserverScope, listener: Listener) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, scope, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Drop the listeners scoped to one entity or its collections.
    pub(crate) fn remove_entity(&mut self, entity: EntityId) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|(_, scope, _)| match scope {
            ObserverScope::Entity(id) | ObserverScope::Association { entity: id, .. } => {
                *id != entity
            }
            _ => true,
        });
        before - self.listeners.len()
    }

    /// True when a listener is registered for this collection association.
    pub(crate) fn watches(&self, entity: EntityId, name: &str) -> bool {
        self.listeners.iter().any(|(_, scope, _)| {
            matches!(scope, ObserverScope::Association { entity: e, name: n } if *e == entity && n == name)
        })
    }

    pub(crate) fn emit(&mut self, event: ChangeEvent) {
        if !self.listeners.is_empty() {
            self.pending.push(event);
        }
    }

    /// Deliver every queued event in order.
    pub(crate) fn flush(&mut self) {
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            for (_, scope, listener) in self.listeners.iter_mut() {
                if scope.matches(event) {
                    listener(event);
                }
            }
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
