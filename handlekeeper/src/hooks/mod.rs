//! Test-runner lifecycle integration.
//!
//! A runner calls [`LifecycleHooks::before_test`] in its setup phase, the
//! test body reads the handle through the registry, and
//! [`LifecycleHooks::after_test`] runs unconditionally in teardown.
//! [`with_resource`] packages the same sequence for code that can wrap the
//! body in a closure.

use async_trait::async_trait;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::warn;

use crate::config::ResourceConfig;
use crate::context::ContextId;
use crate::errors::RegistryError;
use crate::registry::{ResourceRegistry, SharedHandle};
use crate::resource::ResourceFactory;

/// Setup and teardown callbacks invoked by a test runner.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// Prepares the calling context's resource.
    async fn before_test(&self, config: &ResourceConfig) -> Result<(), RegistryError>;

    /// Releases the calling context's resource. Must not fail.
    fn after_test(&self);
}

/// [`LifecycleHooks`] backed by a [`ResourceRegistry`].
pub struct RegistryHooks<F: ResourceFactory> {
    registry: Arc<ResourceRegistry<F>>,
}

impl<F: ResourceFactory> RegistryHooks<F> {
    /// Creates hooks for `registry`.
    #[must_use]
    pub const fn new(registry: Arc<ResourceRegistry<F>>) -> Self {
        Self { registry }
    }

    /// The underlying registry, for test bodies.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ResourceRegistry<F>> {
        &self.registry
    }
}

impl<F: ResourceFactory> Clone for RegistryHooks<F> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

#[async_trait]
impl<F: ResourceFactory> LifecycleHooks for RegistryHooks<F> {
    async fn before_test(&self, config: &ResourceConfig) -> Result<(), RegistryError> {
        self.registry.acquire(config).await.map(|_| ())
    }

    fn after_test(&self) {
        self.registry.release();
    }
}

/// Acquires a handle, runs `body` with it, and releases what it acquired.
///
/// If this call created the handle, it is released whether `body` returns
/// `Ok`, returns `Err`, or panics; a panic is re-raised after release. A
/// handle the context already held (from `before_test`, say) is reused and
/// left live for its owner. Acquisition errors are returned without running
/// `body`.
pub async fn with_resource<F, B, Fut, T>(
    registry: &ResourceRegistry<F>,
    config: &ResourceConfig,
    body: B,
) -> Result<T, RegistryError>
where
    F: ResourceFactory,
    B: FnOnce(SharedHandle<F>) -> Fut,
    Fut: Future<Output = Result<T, RegistryError>>,
{
    let ctx = ContextId::current();
    let borrowed = registry.current_for(ctx).is_ok();
    let handle = registry.acquire_for(ctx, config).await?;

    let outcome = AssertUnwindSafe(body(handle)).catch_unwind().await;
    if !borrowed {
        registry.release_for(ctx);
    }

    match outcome {
        Ok(result) => result,
        Err(panic) => {
            warn!(context = %ctx, released = !borrowed, "Test body panicked");
            std::panic::resume_unwind(panic)
        }
    }
}
