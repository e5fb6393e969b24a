//! The operation handle and its state machine.
//!
//! ```text
//! Pending ──complete/fail──────────────▶ Succeeded | Faulted
//!    │  └─begin_complete─▶ Completing ──▶ Succeeded | Faulted
//!    └──cancel──▶ Canceling ──(any)────▶ Canceled
//! ```
//!
//! Handles are cheap clones of shared state so the transport side can hold
//! one. The completion callback runs at most once, after the terminal
//! status is set and with the state lock released.

use crate::error::{CallbackError, OperationError, OperationResult, UnhandledError};
use crate::fault::Fault;
use crate::kind::{OperationKind, OperationMessages};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Caller-supplied value carried through an operation unchanged.
pub type UserState = Arc<dyn Any + Send + Sync>;

type Callback<T> = Box<dyn FnOnce(&Operation<T>) -> Result<(), CallbackError> + Send>;
type Canceller = Box<dyn FnOnce() + Send>;

/// Operation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// Started, no outcome yet.
    Pending,
    /// The result has been claimed and is being applied. Cancellation is
    /// no longer possible.
    Completing,
    /// Cancellation requested, waiting for the underlying work.
    Canceling,
    Succeeded,
    Faulted,
    Canceled,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Faulted | Self::Canceled)
    }
}

enum Outcome<T> {
    Value(T),
    Fault(Fault),
    Canceled,
}

struct State<T> {
    status: OperationStatus,
    value: Option<T>,
    fault: Option<Fault>,
    error_handled: bool,
    callback: Option<Callback<T>>,
    canceller: Option<Canceller>,
}

struct Shared<T> {
    kind: OperationKind,
    name: String,
    messages: OperationMessages,
    user_state: Option<UserState>,
    cancellable: bool,
    state: Mutex<State<T>>,
}

/// Handle to an asynchronous load, submit or invoke.
pub struct Operation<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("kind", &self.shared.kind)
            .field("name", &self.shared.name)
            .field("status", &self.status())
            .finish()
    }
}

impl<T> Operation<T> {
    pub fn builder(kind: OperationKind, name: impl Into<String>) -> OperationBuilder<T> {
        OperationBuilder {
            kind,
            name: name.into(),
            messages: OperationMessages::default(),
            user_state: None,
            callback: None,
            canceller: None,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.shared.kind
    }

    /// Query or method name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn user_state(&self) -> Option<&UserState> {
        self.shared.user_state.as_ref()
    }

    /// The user state, if it is an `S`.
    pub fn user_state_as<S: Any + Send + Sync>(&self) -> Option<&S> {
        self.shared.user_state.as_ref()?.downcast_ref::<S>()
    }

    pub fn status(&self) -> OperationStatus {
        self.shared.state.lock().status
    }

    /// True once the operation reached a terminal status.
    pub fn is_complete(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn is_canceled(&self) -> bool {
        self.status() == OperationStatus::Canceled
    }

    /// True while the operation can still be canceled.
    pub fn can_cancel(&self) -> bool {
        self.shared.cancellable && self.status() == OperationStatus::Pending
    }

    pub fn has_error(&self) -> bool {
        self.shared.state.lock().fault.is_some()
    }

    pub fn fault(&self) -> Option<Fault> {
        self.shared.state.lock().fault.clone()
    }

    pub fn is_error_handled(&self) -> bool {
        self.shared.state.lock().error_handled
    }

    /// Inspect the result without cloning it.
    pub fn with_value<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.shared.state.lock().value.as_ref())
    }

    // ==================== Transitions ====================

    /// Claim a pending operation before applying its result. Returns false
    /// when the operation is no longer pending (for example because
    /// cancellation was requested), in which case the result is dropped.
    pub fn begin_complete(&self) -> bool {
        let mut state = self.shared.state.lock();
        if state.status != OperationStatus::Pending {
            return false;
        }
        state.status = OperationStatus::Completing;
        true
    }

    /// Complete with a result. Resolves to Canceled when cancellation was
    /// already requested.
    pub fn complete(&self, value: T) -> OperationResult<()> {
        self.finish(Outcome::Value(value))
    }

    /// Complete with a fault. Fails with [`OperationError::Unhandled`] when
    /// the callback did not mark the error handled.
    pub fn fail(&self, fault: impl Into<Fault>) -> OperationResult<()> {
        self.finish(Outcome::Fault(fault.into()))
    }

    /// Request cancellation of the underlying work.
    pub fn cancel(&self) -> OperationResult<()> {
        let canceller = {
            let mut state = self.shared.state.lock();
            match state.status {
                OperationStatus::Pending if self.shared.cancellable => {}
                OperationStatus::Pending => {
                    return Err(OperationError::invalid_state(
                        "operation does not support cancellation",
                    ))
                }
                OperationStatus::Canceling => {
                    return Err(OperationError::invalid_state("cancellation already requested"))
                }
                OperationStatus::Completing => {
                    return Err(OperationError::invalid_state("operation is completing"))
                }
                _ => return Err(OperationError::already_completed()),
            }
            state.status = OperationStatus::Canceling;
            state.canceller.take()
        };
        debug!(kind = %self.shared.kind, name = %self.shared.name, "cancellation requested");
        if let Some(canceller) = canceller {
            canceller();
        }
        Ok(())
    }

    /// The underlying work stopped: complete as Canceled.
    pub fn acknowledge_cancel(&self) -> OperationResult<()> {
        self.finish(Outcome::Canceled)
    }

    /// Mark the fault as handled so it does not escalate. Idempotent.
    pub fn mark_error_handled(&self) -> OperationResult<()> {
        let mut state = self.shared.state.lock();
        if state.fault.is_none() {
            return Err(OperationError::invalid_state(
                "operation has no error to mark handled",
            ));
        }
        state.error_handled = true;
        Ok(())
    }

    fn finish(&self, outcome: Outcome<T>) -> OperationResult<()> {
        let (status, callback) = {
            let mut state = self.shared.state.lock();
            let outcome = match state.status {
                OperationStatus::Pending | OperationStatus::Completing => outcome,
                OperationStatus::Canceling => Outcome::Canceled,
                _ => return Err(OperationError::already_completed()),
            };
            let status = match outcome {
                Outcome::Value(value) => {
                    state.value = Some(value);
                    OperationStatus::Succeeded
                }
                Outcome::Fault(fault) => {
                    state.fault = Some(fault);
                    OperationStatus::Faulted
                }
                Outcome::Canceled => OperationStatus::Canceled,
            };
            state.status = status;
            state.canceller = None;
            (status, state.callback.take())
        };
        debug!(kind = %self.shared.kind, name = %self.shared.name, ?status, "operation completed");

        if let Some(callback) = callback {
            callback(self)?;
        }
        if status == OperationStatus::Faulted {
            return self.escalate();
        }
        Ok(())
    }

    fn escalate(&self) -> OperationResult<()> {
        let fault = {
            let state = self.shared.state.lock();
            match &state.fault {
                Some(fault) if !state.error_handled => fault.clone(),
                _ => return Ok(()),
            }
        };
        let shared = &self.shared;
        let err = UnhandledError {
            kind: shared.kind,
            name: shared.name.clone(),
            message: shared.messages.render(shared.kind, &shared.name, &fault),
            fault,
        };
        warn!(kind = %shared.kind, name = %shared.name, error = %err, "unhandled operation error");
        Err(err.into())
    }
}

impl<T: Clone> Operation<T> {
    /// The result, once Succeeded.
    pub fn value(&self) -> Option<T> {
        self.shared.state.lock().value.clone()
    }
}

/// Builder for an [`Operation`].
pub struct OperationBuilder<T> {
    kind: OperationKind,
    name: String,
    messages: OperationMessages,
    user_state: Option<UserState>,
    callback: Option<Callback<T>>,
    canceller: Option<Canceller>,
}

impl<T> OperationBuilder<T> {
    /// Templates used when a fault escalates.
    pub fn messages(mut self, messages: OperationMessages) -> Self {
        self.messages = messages;
        self
    }

    pub fn user_state(mut self, state: impl Any + Send + Sync) -> Self {
        self.user_state = Some(Arc::new(state));
        self
    }

    /// Attach a user state that is already shared.
    pub fn shared_user_state(mut self, state: UserState) -> Self {
        self.user_state = Some(state);
        self
    }

    /// Run once when the operation completes. Returning an error propagates
    /// it out of the completing call.
    pub fn callback(
        mut self,
        callback: impl FnOnce(&Operation<T>) -> Result<(), CallbackError> + Send + 'static,
    ) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Makes the operation cancellable; `canceller` is invoked once when
    /// cancellation is requested.
    pub fn canceller(mut self, canceller: impl FnOnce() + Send + 'static) -> Self {
        self.canceller = Some(Box::new(canceller));
        self
    }

    pub fn build(self) -> Operation<T> {
        let cancellable = self.canceller.is_some();
        Operation {
            shared: Arc::new(Shared {
                kind: self.kind,
                name: self.name,
                messages: self.messages,
                user_state: self.user_state,
                cancellable,
                state: Mutex::new(State {
                    status: OperationStatus::Pending,
                    value: None,
                    fault: None,
                    error_handled: false,
                    callback: self.callback,
                    canceller: self.canceller,
                }),
            }),
        }
    }
}
