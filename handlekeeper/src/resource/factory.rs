//! Traits implemented by resource providers.

use async_trait::async_trait;

use crate::config::{ResourceConfig, ResourceKind};
use crate::errors::{DisposalError, ResourceCreationError};

/// The expensive, non-shareable thing a handle wraps.
///
/// Implementations own whatever native state (process, socket, session id)
/// must be torn down exactly once.
pub trait NativeResource: Send + Sync + 'static {
    /// Releases the native state.
    ///
    /// Called at most once per resource. Should tolerate the native side
    /// already being gone and report that as an error rather than panic.
    fn close(&self) -> Result<(), DisposalError>;

    /// Returns false if the native side is known to be gone.
    fn is_alive(&self) -> bool {
        true
    }
}

/// Builds resources on behalf of the registry.
///
/// The registry validates the configuration before calling
/// [`create`](Self::create), so `kind` is always one of the supported kinds.
/// Factories do not retry; that is left to the caller.
#[async_trait]
pub trait ResourceFactory: Send + Sync + 'static {
    /// The resource type this factory produces.
    type Resource: NativeResource;

    /// Builds a new, ready-to-use resource.
    async fn create(
        &self,
        kind: ResourceKind,
        config: &ResourceConfig,
    ) -> Result<Self::Resource, ResourceCreationError>;
}
