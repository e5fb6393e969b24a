//! Tether Context
//!
//! The caller-facing entry point. A [`DomainContext`] owns an entity
//! container and a [`DomainClient`], starts load, submit and invoke
//! operations, and applies transport results on the owning thread when
//! [`DomainContext::process_completions`] is called.

mod client;
mod config;
mod context;
mod error;

pub use client::{DomainClient, EntityQuery, Invocation, InvokeResponse, QueryResponse, Reply};
pub use config::ContextConfig;
pub use context::{
    CallOptions, DomainContext, InvokeOperation, LoadOperation, LoadResult, SubmitOperation,
};
pub use error::{ContextError, ContextResult};
