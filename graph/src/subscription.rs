//! Subscription table for association caches.
//!
//! A cache that has been populated registers itself against the set of its
//! target type. Structural changes to that set are dispatched only to the
//! registered caches, and a source's registrations are torn down when it
//! leaves its set.

use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};
use tether_core::{EntityId, TypeId};

/// One association cache listening to a target set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Subscription {
    pub source: EntityId,
    pub association: String,
}

impl Subscription {
    pub(crate) fn new(source: EntityId, association: impl Into<String>) -> Self {
        Self {
            source,
            association: association.into(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct SubscriptionTable {
    by_target: HashMap<TypeId, IndexSet<Subscription>>,
    /// Targets each source is registered against, for teardown.
    by_source: HashMap<EntityId, HashSet<TypeId>>,
}

impl SubscriptionTable {
    pub(crate) fn subscribe(&mut self, target: TypeId, subscription: Subscription) {
        self.by_source
            .entry(subscription.source)
            .or_default()
            .insert(target);
        self.by_target.entry(target).or_default().insert(subscription);
    }

    /// Remove every registration of `source`. Returns how many were removed.
    pub(crate) fn unsubscribe_source(&mut self, source: EntityId) -> usize {
        let Some(targets) = self.by_source.remove(&source) else {
            return 0;
        };
        let mut removed = 0;
        for target in targets {
            if let Some(subs) = self.by_target.get_mut(&target) {
                let before = subs.len();
                subs.retain(|s| s.source != source);
                removed += before - subs.len();
                if subs.is_empty() {
                    self.by_target.remove(&target);
                }
            }
        }
        removed
    }

    /// Snapshot of the caches listening to `target`.
    pub(crate) fn subscribers(&self, target: TypeId) -> Vec<Subscription> {
        self.by_target
            .get(&target)
            .map(|subs| subs.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_target.values().map(IndexSet::len).sum()
    }
}
