//! Lifecycle events emitted by the registry.
//!
//! Sinks are synchronous and must never fail: they are called from the
//! release path, which itself never fails.

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn, Level};
use uuid::Uuid;

use crate::config::ResourceKind;
use crate::context::ContextId;

/// A transition in some context's resource lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A new handle was created and stored.
    Acquired {
        /// Owning context.
        context: String,
        /// New handle id.
        handle_id: Uuid,
        /// Resource kind.
        kind: ResourceKind,
    },
    /// `acquire` returned the context's existing handle.
    Reused {
        /// Owning context.
        context: String,
        /// Existing handle id.
        handle_id: Uuid,
    },
    /// The factory failed; nothing was stored.
    CreationFailed {
        /// Calling context.
        context: String,
        /// Requested kind.
        kind: ResourceKind,
        /// Error message.
        error: String,
    },
    /// A handle was removed from the store and disposed.
    Released {
        /// Owning context.
        context: String,
        /// Released handle id.
        handle_id: Uuid,
    },
    /// Closing the native resource failed during release.
    DisposalFailed {
        /// Owning context.
        context: String,
        /// Handle id.
        handle_id: Uuid,
        /// Error message.
        error: String,
    },
}

impl LifecycleEvent {
    /// Dotted event name, e.g. `resource.acquired`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Acquired { .. } => "resource.acquired",
            Self::Reused { .. } => "resource.reused",
            Self::CreationFailed { .. } => "resource.creation_failed",
            Self::Released { .. } => "resource.released",
            Self::DisposalFailed { .. } => "resource.disposal_failed",
        }
    }

    pub(crate) fn acquired(context: ContextId, handle_id: Uuid, kind: ResourceKind) -> Self {
        Self::Acquired {
            context: context.to_string(),
            handle_id,
            kind,
        }
    }

    pub(crate) fn reused(context: ContextId, handle_id: Uuid) -> Self {
        Self::Reused {
            context: context.to_string(),
            handle_id,
        }
    }

    pub(crate) fn creation_failed(context: ContextId, kind: ResourceKind, error: &impl ToString) -> Self {
        Self::CreationFailed {
            context: context.to_string(),
            kind,
            error: error.to_string(),
        }
    }

    pub(crate) fn released(context: ContextId, handle_id: Uuid) -> Self {
        Self::Released {
            context: context.to_string(),
            handle_id,
        }
    }

    pub(crate) fn disposal_failed(context: ContextId, handle_id: Uuid, error: impl Into<String>) -> Self {
        Self::DisposalFailed {
            context: context.to_string(),
            handle_id,
            error: error.into(),
        }
    }

    /// Serializes the event to JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Receives lifecycle events.
pub trait EventSink: Send + Sync {
    /// Handles an event. Must not panic.
    fn emit(&self, event: &LifecycleEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &LifecycleEvent) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl LoggingEventSink {
    /// Creates a sink logging at `level`.
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self { level }
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: &LifecycleEvent) {
        let data = event.to_json();
        if matches!(event, LifecycleEvent::DisposalFailed { .. } | LifecycleEvent::CreationFailed { .. }) {
            warn!(event_type = event.name(), event_data = %data, "Lifecycle event");
        } else if self.level <= Level::INFO {
            info!(event_type = event.name(), event_data = %data, "Lifecycle event");
        } else {
            debug!(event_type = event.name(), event_data = %data, "Lifecycle event");
        }
    }
}

/// Stores events in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<LifecycleEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.read().clone()
    }

    /// Names of all events received so far.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events.read().iter().map(LifecycleEvent::name).collect()
    }

    /// Number of events with the given name.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events.read().iter().filter(|e| e.name() == name).count()
    }

    /// Clears recorded events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &LifecycleEvent) {
        self.events.write().push(event.clone());
    }
}
