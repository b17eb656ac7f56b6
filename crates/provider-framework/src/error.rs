//! # Provider Errors
//!
//! Error types shared by the registry and the lifecycle dispatcher. Validation
//! failures are not errors: they are returned as data in a
//! [`CheckResult`](crate::CheckResult).

use crate::resource::{Operation, OperationError};
use std::time::Duration;

/// Errors returned by [`Provider`](crate::Provider) calls.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),
    /// The type is registered but has no Create operation, so it can neither be
    /// checked nor created.
    #[error("Resource type {token} does not support creation")]
    UnsupportedResourceType { token: String },
    #[error("Resource type {token} does not support {operation}")]
    UnsupportedOperation { token: String, operation: Operation },
    /// The implementation failed. `source` is its error, unchanged.
    #[error("{operation} of {token}{} failed: {source}", id_suffix(.id))]
    Operation {
        token: String,
        operation: Operation,
        id: Option<String>,
        #[source]
        source: OperationError,
    },
    /// The provider was cancelled while the operation was in flight. Whether its
    /// side effect happened is unknown.
    #[error("{operation} of {token} was cancelled; outcome unknown")]
    Cancelled { token: String, operation: Operation },
    /// The operation exceeded its deadline. Whether its side effect happened is
    /// unknown.
    #[error("{operation} of {token} timed out after {after:?}; outcome unknown")]
    TimedOut {
        token: String,
        operation: Operation,
        after: Duration,
    },
    #[error("Cannot derive identity for {token}: missing {missing:?}")]
    IdentityUnavailable { token: String, missing: Vec<String> },
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),
    #[error("Schema export failed: {0}")]
    Schema(#[from] serde_json::Error),
}

fn id_suffix(id: &Option<String>) -> String {
    id.as_deref().map(|id| format!(" ({id})")).unwrap_or_default()
}

/// Errors raised while building a [`Registry`](crate::Registry).
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid definition for {token}: {reason}")]
    InvalidDefinition { token: String, reason: String },
    #[error("Duplicate resource type: {0}")]
    DuplicateToken(String),
}

/// Errors in provider configuration.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}
