//! Error types for handlekeeper.
//!
//! Configuration and creation failures propagate unchanged through
//! [`ResourceRegistry::acquire`](crate::registry::ResourceRegistry::acquire).
//! Disposal failures never reach the caller; they exist so the cleanup path
//! has something structured to log.

use std::collections::HashMap;
use thiserror::Error;

use crate::context::ContextId;

/// Boxed cause carried by a [`ResourceCreationError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The supplied configuration is invalid or names an unsupported kind.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The factory failed to build the resource.
    #[error("{0}")]
    ResourceCreation(#[from] ResourceCreationError),

    /// `current()` was called before a successful `acquire()`.
    #[error("{0}")]
    NotInitialized(#[from] NotInitializedError),

    /// A caller-side timeout elapsed while acquiring.
    #[error("Resource acquisition timed out after {after_ms}ms")]
    Timeout {
        /// The timeout that elapsed, in milliseconds.
        after_ms: u64,
    },
}

impl RegistryError {
    /// Returns true if retrying with the same configuration could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ResourceCreation(_) | Self::Timeout { .. })
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        match self {
            Self::Configuration(err) => {
                map.insert("type".to_string(), serde_json::json!("ConfigurationError"));
                map.insert("field".to_string(), serde_json::json!(err.field));
                if let Some(ref value) = err.value {
                    map.insert("value".to_string(), serde_json::json!(value));
                }
            }
            Self::ResourceCreation(err) => {
                map.insert("type".to_string(), serde_json::json!("ResourceCreationError"));
                map.insert("kind".to_string(), serde_json::json!(err.kind));
                if let Some(ref source) = err.source {
                    map.insert("cause".to_string(), serde_json::json!(source.to_string()));
                }
            }
            Self::NotInitialized(err) => {
                map.insert("type".to_string(), serde_json::json!("NotInitializedError"));
                map.insert("context".to_string(), serde_json::json!(err.context.to_string()));
            }
            Self::Timeout { after_ms } => {
                map.insert("type".to_string(), serde_json::json!("Timeout"));
                map.insert("after_ms".to_string(), serde_json::json!(after_ms));
            }
        }

        map.insert("retryable".to_string(), serde_json::json!(self.is_retryable()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Error raised when a configuration cannot be turned into a resource kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Configuration error: {message}")]
pub struct ConfigurationError {
    /// The offending field.
    pub field: String,
    /// The rejected value, if one was supplied.
    pub value: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl ConfigurationError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: None,
            message: message.into(),
        }
    }

    /// Records the rejected value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Creates an error for an unrecognised resource kind.
    #[must_use]
    pub fn unsupported_kind(kind: impl Into<String>) -> Self {
        let kind = kind.into();
        Self::new("kind", format!("unsupported resource kind '{kind}'")).with_value(kind)
    }

    /// Creates an error for a field that must be present.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("missing required field '{field}'");
        Self::new(field, message)
    }
}

/// Error raised when the factory cannot build a resource.
#[derive(Debug, Error)]
#[error("Failed to create '{kind}' resource: {message}")]
pub struct ResourceCreationError {
    /// The resource kind that was being created.
    pub kind: String,
    /// Description of the failure.
    pub message: String,
    /// The underlying cause (network, process spawn, ...).
    #[source]
    pub source: Option<BoxError>,
}

impl ResourceCreationError {
    /// Creates a new creation error without an underlying cause.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Error raised when a context asks for its handle before acquiring one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("No resource acquired for context {context}; call acquire() first")]
pub struct NotInitializedError {
    /// The context that had no handle.
    pub context: ContextId,
}

impl NotInitializedError {
    /// Creates a new not-initialized error.
    #[must_use]
    pub const fn new(context: ContextId) -> Self {
        Self { context }
    }
}

/// Failure while closing a native resource.
///
/// Logged and swallowed by the cleanup path; never returned by `release`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Disposal failed: {message}")]
pub struct DisposalError {
    /// Description of the failure.
    pub message: String,
}

impl DisposalError {
    /// Creates a new disposal error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
