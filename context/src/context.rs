//! The domain context.

use crate::client::{DomainClient, EntityQuery, Invocation, InvokeResponse, QueryResponse, Reply};
use crate::config::ContextConfig;
use crate::error::{ContextError, ContextResult};
use futures::channel::oneshot;
use std::any::Any;
use std::sync::Arc;
use tether_changeset::{apply_response, ChangeSet, ChangeSetBuilder, SubmitOutcome, SubmitResponse};
use tether_core::{push_unique, EntityId, GraphError, RemoteFault, Value};
use tether_graph::{EntityContainer, LoadBehavior};
use tether_operation::{
    CallbackError, CancellationToken, Fault, Operation, OperationError, OperationKind,
    OperationResult, OperationStatus, UserState,
};
use tether_registry::Registry;
use tracing::{debug, warn};

/// Entities produced by a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadResult {
    /// Root entities in result order.
    pub entities: Vec<EntityId>,
    /// Root entities followed by included ones.
    pub all_entities: Vec<EntityId>,
    /// Total count reported by the server, or -1.
    pub total_count: i64,
}

pub type LoadOperation = Operation<LoadResult>;
/// Completes with the changeset the server accepted.
pub type SubmitOperation = Operation<ChangeSet>;
pub type InvokeOperation = Operation<Value>;

type Callback<T> = Box<dyn FnOnce(&Operation<T>) -> Result<(), CallbackError> + Send>;

/// Per-call completion callback and user state.
pub struct CallOptions<T> {
    callback: Option<Callback<T>>,
    user_state: Option<UserState>,
}

impl<T> Default for CallOptions<T> {
    fn default() -> Self {
        Self {
            callback: None,
            user_state: None,
        }
    }
}

impl<T> CallOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run once when the operation completes. The callback may mark a
    /// fault handled to keep it from escalating.
    pub fn callback(
        mut self,
        callback: impl FnOnce(&Operation<T>) -> Result<(), CallbackError> + Send + 'static,
    ) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn user_state(mut self, state: impl Any + Send + Sync) -> Self {
        self.user_state = Some(Arc::new(state));
        self
    }
}

/// A transport call whose reply has not been applied yet.
enum Pending {
    Load {
        operation: LoadOperation,
        behavior: LoadBehavior,
        reply: Reply<QueryResponse>,
    },
    Submit {
        operation: SubmitOperation,
        changeset: ChangeSet,
        reply: Reply<SubmitResponse>,
    },
    Invoke {
        operation: InvokeOperation,
        reply: Reply<InvokeResponse>,
    },
}

/// What to do with a polled reply.
enum Claim<R> {
    Waiting,
    Settled(OperationResult<()>),
    Apply(R),
}

/// Entry point for loading, editing and submitting entities.
///
/// Operations complete only inside [`DomainContext::process_completions`],
/// so every container mutation happens on the thread that owns the
/// context.
pub struct DomainContext<C> {
    client: C,
    container: EntityContainer,
    config: ContextConfig,
    pending: Vec<Pending>,
    last_submit: Option<SubmitOperation>,
}

impl<C: DomainClient> DomainContext<C> {
    pub fn new(client: C, registry: Arc<Registry>, config: ContextConfig) -> Self {
        Self {
            client,
            container: EntityContainer::new(registry),
            config,
            pending: Vec::new(),
            last_submit: None,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn container(&self) -> &EntityContainer {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut EntityContainer {
        &mut self.container
    }

    // ==================== Status ====================

    pub fn has_changes(&self) -> bool {
        self.container.has_changes()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.iter().any(|p| matches!(p, Pending::Load { .. }))
    }

    pub fn is_submitting(&self) -> bool {
        self.pending.iter().any(|p| matches!(p, Pending::Submit { .. }))
    }

    /// True while any transport reply is outstanding.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Revert every pending change in the container.
    pub fn reject_changes(&mut self) -> ContextResult<()> {
        if self.is_submitting() {
            return Err(ContextError::SubmitInProgress);
        }
        self.container.reject_changes()?;
        Ok(())
    }

    // ==================== Operations ====================

    /// Start a query. `behavior` defaults to the configured load behavior.
    pub fn load(
        &mut self,
        query: EntityQuery,
        behavior: Option<LoadBehavior>,
        options: CallOptions<LoadResult>,
    ) -> ContextResult<LoadOperation> {
        if self
            .container
            .registry()
            .get_type_by_name(&query.entity_type)
            .is_none()
        {
            return Err(GraphError::unknown_type(&query.entity_type).into());
        }
        let behavior = behavior.unwrap_or(self.config.default_load_behavior);

        let (operation, token) = self.start(OperationKind::Load, &query.name, options);
        let reply = self.client.query(&query, token);
        debug!(query = %query.name, entity_type = %query.entity_type, ?behavior, "load started");

        self.pending.push(Pending::Load {
            operation: operation.clone(),
            behavior,
            reply,
        });
        Ok(operation)
    }

    /// Submit every pending change. With nothing to submit the operation
    /// completes before this returns and the client is not called.
    pub fn submit_changes(
        &mut self,
        options: CallOptions<ChangeSet>,
    ) -> ContextResult<SubmitOperation> {
        if self.is_submitting() {
            return Err(ContextError::SubmitInProgress);
        }
        let unreviewed = self
            .last_submit
            .as_ref()
            .is_some_and(|op| op.has_error() && !op.is_error_handled());
        if self.config.require_error_review && unreviewed {
            return Err(ContextError::UnreviewedSubmitError);
        }

        let changeset = ChangeSetBuilder::new(&self.container).build()?;
        let (operation, token) = self.start(OperationKind::Submit, "SubmitChanges", options);
        self.last_submit = Some(operation.clone());

        if changeset.is_empty() {
            debug!("nothing to submit");
            operation.complete(changeset)?;
            return Ok(operation);
        }

        let reply = self.client.submit(&changeset, token);
        debug!(entries = changeset.len(), "submit started");
        self.pending.push(Pending::Submit {
            operation: operation.clone(),
            changeset,
            reply,
        });
        Ok(operation)
    }

    /// Call a server method.
    pub fn invoke(
        &mut self,
        invocation: Invocation,
        options: CallOptions<Value>,
    ) -> ContextResult<InvokeOperation> {
        let (operation, token) = self.start(OperationKind::Invoke, &invocation.name, options);
        let reply = self.client.invoke(&invocation, token);
        debug!(
            method = %invocation.name,
            side_effects = invocation.has_side_effects,
            "invoke started"
        );

        self.pending.push(Pending::Invoke {
            operation: operation.clone(),
            reply,
        });
        Ok(operation)
    }

    // ==================== Completion ====================

    /// Apply every reply that has arrived and complete its operation.
    ///
    /// Returns the errors raised by completion: faults nobody marked
    /// handled and failing callbacks. Operations still waiting for their
    /// reply stay pending.
    pub fn process_completions(&mut self) -> Vec<OperationError> {
        let mut errors = Vec::new();
        let mut waiting = Vec::new();

        for mut pending in std::mem::take(&mut self.pending) {
            match self.settle(&mut pending) {
                None => waiting.push(pending),
                Some(Err(err)) => errors.push(err),
                Some(Ok(())) => {}
            }
        }
        self.pending = waiting;
        errors
    }

    fn settle(&mut self, pending: &mut Pending) -> Option<OperationResult<()>> {
        match pending {
            Pending::Load {
                operation,
                behavior,
                reply,
            } => match claim(operation, reply) {
                Claim::Waiting => None,
                Claim::Settled(result) => Some(result),
                Claim::Apply(response) => Some(match self.apply_load(*behavior, response) {
                    Ok(result) => operation.complete(result),
                    Err(err) => operation.fail(rejected_reply(&err)),
                }),
            },
            Pending::Submit {
                operation,
                changeset,
                reply,
            } => match claim(operation, reply) {
                Claim::Waiting => None,
                Claim::Settled(result) => Some(result),
                Claim::Apply(response) => {
                    let changeset = std::mem::take(changeset);
                    Some(match apply_response(&mut self.container, &changeset, response) {
                        Ok(SubmitOutcome::Accepted) => operation.complete(changeset),
                        Ok(SubmitOutcome::Rejected { fault, .. }) => operation.fail(fault),
                        Err(err) => operation.fail(rejected_reply(&err)),
                    })
                }
            },
            Pending::Invoke { operation, reply } => match claim(operation, reply) {
                Claim::Waiting => None,
                Claim::Settled(result) => Some(result),
                Claim::Apply(response) => {
                    if response.validation_errors.is_empty() {
                        Some(operation.complete(response.value))
                    } else {
                        let mut errors = Vec::new();
                        for error in response.validation_errors {
                            push_unique(&mut errors, error);
                        }
                        Some(operation.fail(Fault::ValidationFailed(errors)))
                    }
                }
            },
        }
    }

    fn apply_load(
        &mut self,
        behavior: LoadBehavior,
        response: QueryResponse,
    ) -> Result<LoadResult, GraphError> {
        let entities = self.container.load(response.entities, behavior)?;
        let included = self.container.load(response.included, behavior)?;

        let mut all_entities = entities.clone();
        for id in included {
            if !all_entities.contains(&id) {
                all_entities.push(id);
            }
        }
        debug!(
            entities = entities.len(),
            all = all_entities.len(),
            "load applied"
        );
        Ok(LoadResult {
            entities,
            all_entities,
            total_count: response.total_count,
        })
    }

    fn start<T: 'static>(
        &self,
        kind: OperationKind,
        name: &str,
        options: CallOptions<T>,
    ) -> (Operation<T>, CancellationToken) {
        let token = CancellationToken::new();
        let mut builder = Operation::builder(kind, name).messages(self.config.messages.clone());
        if let Some(callback) = options.callback {
            builder = builder.callback(callback);
        }
        if let Some(state) = options.user_state {
            builder = builder.shared_user_state(state);
        }
        if self.config.allow_cancellation && self.client.supports_cancellation() {
            let transport = token.clone();
            builder = builder.canceller(move || transport.cancel());
        }
        (builder.build(), token)
    }
}

/// Poll `reply` and decide the operation's fate. Cancellation wins over a
/// reply that arrives after it was requested.
fn claim<T, R>(operation: &Operation<T>, reply: &mut Reply<R>) -> Claim<R> {
    let received = match reply.try_recv() {
        Ok(None) => return Claim::Waiting,
        Ok(Some(result)) => Some(result),
        Err(oneshot::Canceled) => None,
    };

    if operation.begin_complete() {
        return match received {
            Some(Ok(response)) => Claim::Apply(response),
            Some(Err(fault)) => Claim::Settled(operation.fail(fault)),
            None => Claim::Settled(operation.fail(RemoteFault::new(
                0,
                0,
                "The transport dropped the request without replying",
            ))),
        };
    }

    if operation.status() == OperationStatus::Canceling {
        if received.is_some() {
            warn!(
                kind = %operation.kind(),
                name = %operation.name(),
                "reply arrived after cancellation; dropped"
            );
        }
        return Claim::Settled(operation.acknowledge_cancel());
    }
    Claim::Settled(Ok(()))
}

/// Fault for a reply the container could not apply.
fn rejected_reply(err: &dyn std::error::Error) -> Fault {
    warn!(error = %err, "reply could not be applied");
    Fault::remote(0, 0, err.to_string())
}
