//! Validation results and remote faults.
//!
//! Both records originate outside the runtime (server-side validation and
//! the transport) and are carried unchanged to entities and operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A validation or conflict result attached to an entity or an operation.
///
/// Equality is structural over message, code, stack and member set, so
/// collections of results can be deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationResult {
    pub message: String,
    pub code: i32,
    pub stack: Option<String>,
    pub members: BTreeSet<String>,
}

impl ValidationResult {
    /// An entity-level result (no source members).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 0,
            stack: None,
            members: BTreeSet::new(),
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.members.insert(member.into());
        self
    }

    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members.extend(members.into_iter().map(Into::into));
        self
    }

    /// True when the result applies to the entity as a whole.
    pub fn is_entity_level(&self) -> bool {
        self.members.is_empty()
    }

    pub fn applies_to(&self, member: &str) -> bool {
        self.members.contains(member)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.members.is_empty() {
            write!(f, "{}", self.message)
        } else {
            let members: Vec<&str> = self.members.iter().map(String::as_str).collect();
            write!(f, "{} [{}]", self.message, members.join(", "))
        }
    }
}

/// Append `result` unless a structurally equal one is already present.
/// Returns true when it was added.
pub fn push_unique(results: &mut Vec<ValidationResult>, result: ValidationResult) -> bool {
    if results.contains(&result) {
        return false;
    }
    results.push(result);
    true
}

/// A fault reported by the transport or the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFault {
    /// Transport status (e.g. an HTTP status); 0 when unknown.
    pub status: u16,
    /// Server error code.
    pub code: i32,
    pub message: String,
    /// Server-side stack text, kept as supplementary detail.
    pub stack: Option<String>,
}

impl RemoteFault {
    pub fn new(status: u16, code: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl fmt::Display for RemoteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (status {}, code {})",
            self.message, self.status, self.code
        )
    }
}

impl std::error::Error for RemoteFault {}
