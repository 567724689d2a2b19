//! # Handlekeeper
//!
//! Per-execution-context lifecycle management for resource handles that are
//! expensive to create, unsafe to share between concurrent units of work,
//! and must be released deterministically: browser sessions, driver
//! processes, remote grid slots.
//!
//! - **Context isolation**: each thread and each tokio task owns at most one
//!   live handle; [`ContextId::scope`](context::ContextId::scope) gives a
//!   future its own context explicitly
//! - **Lazy creation**: the first `acquire` in a context builds the resource;
//!   later calls return the same handle
//! - **Fail-fast access**: `current()` without a prior `acquire` is an error,
//!   never an implicit construction
//! - **Guaranteed cleanup**: `release` is idempotent and infallible, and
//!   guards release on drop and unwind
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use handlekeeper::prelude::*;
//!
//! static SESSIONS: RegistryCell<BrowserFactory> = RegistryCell::new();
//!
//! fn sessions() -> Arc<ResourceRegistry<BrowserFactory>> {
//!     SESSIONS.get_or_init(|| ResourceRegistry::new(BrowserFactory::default()))
//! }
//!
//! // before each test
//! sessions().acquire(&ResourceConfig::from_env()?).await?;
//!
//! // in the test body
//! let session = sessions().current()?;
//!
//! // after each test, unconditionally
//! sessions().release();
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod hooks;
pub mod observability;
pub mod policy;
pub mod registry;
pub mod resource;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::config::{ResourceConfig, ResourceKind};
    pub use crate::context::{ContextId, ContextLocalStore};
    pub use crate::errors::{
        ConfigurationError, DisposalError, NotInitializedError, RegistryError,
        ResourceCreationError,
    };
    pub use crate::events::{
        CollectingEventSink, EventSink, LifecycleEvent, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::hooks::{with_resource, LifecycleHooks, RegistryHooks};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::policy::{
        acquire_with_retry, acquire_with_timeout, BackoffStrategy, JitterStrategy, RetryPolicy,
    };
    pub use crate::registry::{RegistryCell, ReleaseGuard, ResourceRegistry, SharedHandle};
    pub use crate::resource::{
        DisposeOutcome, HandleState, NativeResource, ResourceFactory, ResourceHandle,
    };
}
