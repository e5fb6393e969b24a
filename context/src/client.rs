//! The transport seam.
//!
//! A [`DomainClient`] starts remote work and hands back a oneshot receiver
//! for its outcome. The context never blocks on a reply; it polls the
//! receivers from [`crate::DomainContext::process_completions`]. A client
//! that drops its sender without replying faults the operation.

use futures::channel::oneshot;
use serde::{Deserialize, Serialize};
use tether_changeset::{ChangeSet, SubmitResponse};
use tether_core::{Attributes, RemoteFault, ValidationResult, Value};
use tether_graph::EntityRecord;
use tether_operation::CancellationToken;

/// Pending outcome of one transport call.
pub type Reply<T> = oneshot::Receiver<Result<T, RemoteFault>>;

/// A named query over one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityQuery {
    /// Query (method) name on the server.
    pub name: String,
    /// Type of the root entities the query returns.
    pub entity_type: String,
    #[serde(default)]
    pub parameters: Attributes,
    /// Ask the server to report the total count beyond paging.
    #[serde(default)]
    pub include_total_count: bool,
}

impl EntityQuery {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            parameters: Attributes::new(),
            include_total_count: false,
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_total_count(mut self) -> Self {
        self.include_total_count = true;
        self
    }
}

/// Records returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Root entities, in result order.
    pub entities: Vec<EntityRecord>,
    /// Related entities returned alongside the roots.
    #[serde(default)]
    pub included: Vec<EntityRecord>,
    /// Total count, or -1 when the server did not compute it.
    #[serde(default = "unknown_count")]
    pub total_count: i64,
}

fn unknown_count() -> i64 {
    -1
}

impl QueryResponse {
    pub fn new(entities: Vec<EntityRecord>) -> Self {
        Self {
            entities,
            included: Vec::new(),
            total_count: unknown_count(),
        }
    }

    pub fn with_included(mut self, included: Vec<EntityRecord>) -> Self {
        self.included = included;
        self
    }

    pub fn with_total_count(mut self, total_count: i64) -> Self {
        self.total_count = total_count;
        self
    }
}

/// A call to a server method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub name: String,
    #[serde(default)]
    pub parameters: Attributes,
    /// The method changes server state.
    #[serde(default)]
    pub has_side_effects: bool,
}

impl Invocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Attributes::new(),
            has_side_effects: false,
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_side_effects(mut self) -> Self {
        self.has_side_effects = true;
        self
    }
}

/// Result of a server method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub value: Value,
    #[serde(default)]
    pub validation_errors: Vec<ValidationResult>,
}

impl InvokeResponse {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            validation_errors: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: ValidationResult) -> Self {
        self.validation_errors.push(error);
        self
    }
}

/// Transport used by a [`crate::DomainContext`].
///
/// Implementations may complete the returned receivers from any thread.
/// `cancel` is raised when the caller cancels the operation; honoring it
/// is best effort.
pub trait DomainClient {
    /// Whether the transport can abort work it has started.
    fn supports_cancellation(&self) -> bool {
        false
    }

    fn query(&self, query: &EntityQuery, cancel: CancellationToken) -> Reply<QueryResponse>;

    fn submit(&self, changeset: &ChangeSet, cancel: CancellationToken) -> Reply<SubmitResponse>;

    fn invoke(&self, invocation: &Invocation, cancel: CancellationToken) -> Reply<InvokeResponse>;
}
