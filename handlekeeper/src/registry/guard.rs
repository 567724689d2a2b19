//! Scoped release.

use std::sync::Arc;

use super::{ResourceRegistry, SharedHandle};
use crate::context::ContextId;
use crate::errors::RegistryError;
use crate::resource::ResourceFactory;

/// Releases a context's handle when dropped, including during unwinding.
///
/// The guard records the context it was created in, so dropping it on a
/// different thread still releases the right handle.
#[must_use = "the handle is released as soon as the guard is dropped"]
pub struct ReleaseGuard<F: ResourceFactory> {
    registry: Arc<ResourceRegistry<F>>,
    context: ContextId,
    armed: bool,
}

impl<F: ResourceFactory> ReleaseGuard<F> {
    pub(super) const fn new(registry: Arc<ResourceRegistry<F>>, context: ContextId) -> Self {
        Self {
            registry,
            context,
            armed: true,
        }
    }

    /// The guarded context.
    #[must_use]
    pub const fn context(&self) -> ContextId {
        self.context
    }

    /// The guarded context's handle.
    pub fn handle(&self) -> Result<SharedHandle<F>, RegistryError> {
        self.registry.current_for(self.context)
    }

    /// Disarms the guard; the handle stays stored.
    pub fn defuse(mut self) {
        self.armed = false;
    }
}

impl<F: ResourceFactory> Drop for ReleaseGuard<F> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.release_for(self.context);
        }
    }
}

impl<F: ResourceFactory> std::fmt::Debug for ReleaseGuard<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseGuard")
            .field("context", &self.context)
            .field("armed", &self.armed)
            .finish()
    }
}
