//! Composite entity keys.

use crate::{Attributes, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered tuple of key-member values identifying an entity within its set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey(Vec<Value>);

impl EntityKey {
    pub fn new(parts: Vec<Value>) -> Self {
        Self(parts)
    }

    /// Build a key by reading `members` out of `values`, in order.
    /// Missing members read as Null.
    pub fn from_members<'a>(
        values: &Attributes,
        members: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        Self(
            members
                .into_iter()
                .map(|m| values.get(m).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }

    /// A key is complete when no part is Null.
    pub fn is_complete(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|v| !v.is_null())
    }

    pub fn parts(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Value> for EntityKey {
    fn from(value: Value) -> Self {
        Self(vec![value])
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", part)?;
        }
        write!(f, ")")
    }
}
