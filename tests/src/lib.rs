//! Tether integration test support.
//!
//! Fixtures shared by the scenario tests under `tests/`:
//! - Schemas: a customer/order/detail model and a composite-key model
//! - A [`MockClient`] whose requests are answered by the test, from the
//!   test thread or from another one
//! - An [`EventLog`] recording container change events

mod mock;

pub use events::EventLog;
pub use fixtures::{composite_registry, context, init_tracing, record, sales_registry};
pub use mock::{MockClient, Request};

/// Everything a scenario test usually needs.
pub mod prelude {
    pub use crate::{
        composite_registry, context, init_tracing, record, sales_registry, EventLog, MockClient,
        Request,
    };
    pub use tether_changeset::{
        ChangeSetBuilder, ConflictInfo, EntityOperation, EntryResult, SubmitResponse,
    };
    pub use tether_context::{
        CallOptions, ContextConfig, ContextError, DomainContext, EntityQuery, Invocation,
        InvokeResponse, LoadOperation, QueryResponse, SubmitOperation,
    };
    pub use tether_core::{
        attrs, EntityId, EntityKey, EntityState, GraphError, RemoteFault, ValidationResult, Value,
    };
    pub use tether_graph::{
        ChangeEvent, CollectionAction, EntityContainer, EntityRecord, LoadBehavior, ObserverScope,
    };
    pub use tether_operation::{
        CallbackError, Fault, Operation, OperationError, OperationKind, OperationStatus,
    };
}
