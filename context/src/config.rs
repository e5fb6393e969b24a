//! Context configuration.

use crate::error::ContextResult;
use serde::{Deserialize, Serialize};
use tether_graph::LoadBehavior;
use tether_operation::OperationMessages;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Merge behavior for loads that do not name one.
    pub default_load_behavior: LoadBehavior,
    /// Refuse a new submit while the previous submit's error is unhandled.
    pub require_error_review: bool,
    /// Offer cancellation on operations when the client supports it.
    pub allow_cancellation: bool,
    pub messages: OperationMessages,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_load_behavior: LoadBehavior::default(),
            require_error_review: false,
            allow_cancellation: true,
            messages: OperationMessages::default(),
        }
    }
}

impl ContextConfig {
    /// Parse a configuration; omitted fields keep their defaults.
    pub fn from_json(json: &str) -> ContextResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
