//! Operation kinds and their unhandled-error messages.

use crate::fault::Fault;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Load,
    Submit,
    Invoke,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "Load",
            Self::Submit => "Submit",
            Self::Invoke => "Invoke",
        };
        f.write_str(name)
    }
}

/// Message templates used when a fault escalates unhandled.
///
/// `{name}` is replaced by the query or method name and `{message}` by the
/// fault's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationMessages {
    pub load: String,
    pub submit: String,
    pub submit_validation: String,
    pub submit_conflict: String,
    pub invoke: String,
    pub invoke_validation: String,
}

impl Default for OperationMessages {
    fn default() -> Self {
        Self {
            load: "Load operation failed for query '{name}'. {message}".into(),
            submit: "Submit operation failed. {message}".into(),
            submit_validation: "Submit operation failed validation. Inspect the validation errors of each entity in error.".into(),
            submit_conflict: "Submit operation failed due to conflicts. Inspect the conflict of each entity in error.".into(),
            invoke: "Invoke operation '{name}' failed. {message}".into(),
            invoke_validation: "Invoke operation '{name}' failed validation. {message}".into(),
        }
    }
}

impl OperationMessages {
    /// Render the message for an unhandled fault.
    pub fn render(&self, kind: OperationKind, name: &str, fault: &Fault) -> String {
        let template = match (kind, fault) {
            (OperationKind::Load, _) => &self.load,
            (OperationKind::Submit, Fault::ValidationFailed(_)) => &self.submit_validation,
            (OperationKind::Submit, Fault::ConflictDetected(_)) => &self.submit_conflict,
            (OperationKind::Submit, Fault::Remote(_)) => &self.submit,
            (OperationKind::Invoke, Fault::ValidationFailed(_)) => &self.invoke_validation,
            (OperationKind::Invoke, _) => &self.invoke,
        };
        let message = match fault {
            Fault::Remote(remote) => remote.message.clone(),
            other => other.to_string(),
        };
        template
            .replace("{name}", name)
            .replace("{message}", &message)
            .trim_end()
            .to_string()
    }
}
