//! Entity change-state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Change-state of an entity relative to the last accepted server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntityState {
    /// Not tracked by any entity set.
    #[default]
    Detached,
    /// Tracked and equal to the last accepted server state.
    Unmodified,
    /// Added locally, pending insert.
    New,
    /// Edited locally, pending update.
    Modified,
    /// Removed locally, pending delete.
    Deleted,
}

impl EntityState {
    /// True for states that take part in a changeset.
    pub fn has_changes(&self) -> bool {
        matches!(self, Self::New | Self::Modified | Self::Deleted)
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Detached => "Detached",
            Self::Unmodified => "Unmodified",
            Self::New => "New",
            Self::Modified => "Modified",
            Self::Deleted => "Deleted",
        };
        f.write_str(name)
    }
}
