//! The per-context resource registry.
//!
//! This module provides:
//! - ResourceRegistry, an explicitly constructed coordinator of handles
//! - RegistryCell, a lazily initialised process-wide registry slot
//! - ReleaseGuard, which releases a context's handle when dropped

mod cell;
mod guard;

pub use cell::RegistryCell;
pub use guard::ReleaseGuard;

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ResourceConfig;
use crate::context::{ContextId, ContextLocalStore};
use crate::errors::{NotInitializedError, RegistryError};
use crate::events::{EventSink, LifecycleEvent, NoOpEventSink};
use crate::resource::{DisposeOutcome, HandleState, ResourceFactory, ResourceHandle};

/// Shared handle type produced by a registry over factory `F`.
pub type SharedHandle<F> = Arc<ResourceHandle<<F as ResourceFactory>::Resource>>;

/// Coordinates at most one live resource handle per execution context.
///
/// Operations without a suffix act on [`ContextId::current`]; the `_for`
/// variants take an explicit context. A context is expected to call these
/// sequentially on its own behalf. Different contexts never block one
/// another except on the store's shard locks, which are never held across
/// resource creation.
pub struct ResourceRegistry<F: ResourceFactory> {
    factory: Arc<F>,
    store: ContextLocalStore<ResourceHandle<F::Resource>>,
    events: Arc<dyn EventSink>,
}

impl<F: ResourceFactory> ResourceRegistry<F> {
    /// Creates a registry that builds resources with `factory`.
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self::with_shared_factory(Arc::new(factory))
    }

    /// Creates a registry over an already shared factory.
    #[must_use]
    pub fn with_shared_factory(factory: Arc<F>) -> Self {
        Self {
            factory,
            store: ContextLocalStore::new(),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the sink that receives lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The factory used to build resources.
    #[must_use]
    pub fn factory(&self) -> &Arc<F> {
        &self.factory
    }

    /// Returns the caller's handle, creating it on first use.
    pub async fn acquire(&self, config: &ResourceConfig) -> Result<SharedHandle<F>, RegistryError> {
        self.acquire_for(ContextId::current(), config).await
    }

    /// Returns `ctx`'s handle, creating it on first use.
    ///
    /// The configuration is validated on every call, before any existing
    /// handle is reused; an invalid one fails without touching the stored
    /// handle. Nothing is stored unless creation succeeds, so a failed or
    /// cancelled acquire leaves the context uninitialized.
    pub async fn acquire_for(
        &self,
        ctx: ContextId,
        config: &ResourceConfig,
    ) -> Result<SharedHandle<F>, RegistryError> {
        let kind = config.validate()?;

        if let Some(existing) = self.live_handle(&ctx) {
            self.events.emit(&LifecycleEvent::reused(ctx, existing.id()));
            return Ok(existing);
        }

        debug!(context = %ctx, kind = %kind, "Creating resource");
        let resource = match self.factory.create(kind, config).await {
            Ok(resource) => resource,
            Err(err) => {
                debug!(context = %ctx, kind = %kind, error = %err, "Resource creation failed");
                self.events.emit(&LifecycleEvent::creation_failed(ctx, kind, &err));
                return Err(err.into());
            }
        };

        let handle = Arc::new(ResourceHandle::new(resource, kind, ctx));
        match self.store.insert_if_absent(ctx, handle) {
            Ok(stored) => {
                debug!(context = %ctx, handle_id = %stored.id(), kind = %kind, "Resource acquired");
                self.events.emit(&LifecycleEvent::acquired(ctx, stored.id(), kind));
                Ok(stored)
            }
            Err((existing, fresh)) => {
                warn!(
                    context = %ctx,
                    handle_id = %existing.id(),
                    "Context acquired concurrently with itself; keeping the stored handle"
                );
                fresh.dispose();
                Ok(existing)
            }
        }
    }

    /// Returns the caller's handle.
    ///
    /// Fails with [`RegistryError::NotInitialized`] if the caller has not
    /// acquired one, or has released it since.
    pub fn current(&self) -> Result<SharedHandle<F>, RegistryError> {
        self.current_for(ContextId::current())
    }

    /// Returns `ctx`'s handle.
    pub fn current_for(&self, ctx: ContextId) -> Result<SharedHandle<F>, RegistryError> {
        self.live_handle(&ctx)
            .ok_or_else(|| NotInitializedError::new(ctx).into())
    }

    /// Releases the caller's handle, if any. Never fails.
    pub fn release(&self) {
        self.release_for(ContextId::current());
    }

    /// Removes and disposes `ctx`'s handle, if any. Never fails.
    ///
    /// Returns the dispose outcome, or `None` if there was nothing to release.
    pub fn release_for(&self, ctx: ContextId) -> Option<DisposeOutcome> {
        let handle = self.store.remove(&ctx)?;
        Some(self.dispose_removed(ctx, &handle))
    }

    /// Lifecycle state of the caller's resource.
    #[must_use]
    pub fn state(&self) -> HandleState {
        self.state_for(ContextId::current())
    }

    /// Lifecycle state of `ctx`'s resource.
    #[must_use]
    pub fn state_for(&self, ctx: ContextId) -> HandleState {
        self.store
            .get(&ctx)
            .map_or(HandleState::Uninitialized, |handle| handle.state())
    }

    /// Returns a guard that releases the caller's handle when dropped.
    #[must_use]
    pub fn guard(self: &Arc<Self>) -> ReleaseGuard<F> {
        ReleaseGuard::new(Arc::clone(self), ContextId::current())
    }

    /// Number of contexts currently holding a handle.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.store.len()
    }

    /// Contexts currently holding a handle.
    #[must_use]
    pub fn contexts(&self) -> Vec<ContextId> {
        self.store.contexts()
    }

    /// Releases every stored handle. Returns how many were released.
    ///
    /// Intended for process shutdown, after the contexts that own the
    /// handles have stopped.
    pub fn release_all(&self) -> usize {
        let drained = self.store.drain();
        let count = drained.len();
        for (ctx, handle) in drained {
            self.dispose_removed(ctx, &handle);
        }
        if count > 0 {
            debug!(count, "Released all resources");
        }
        count
    }

    /// Looks up `ctx`'s handle, evicting it if it was disposed out of band.
    fn live_handle(&self, ctx: &ContextId) -> Option<SharedHandle<F>> {
        let handle = self.store.get(ctx)?;
        if handle.is_disposed() {
            debug!(context = %ctx, handle_id = %handle.id(), "Evicting disposed handle");
            self.store.remove_if_same(ctx, &handle);
            return None;
        }
        Some(handle)
    }

    fn dispose_removed(&self, ctx: ContextId, handle: &SharedHandle<F>) -> DisposeOutcome {
        let outcome = handle.dispose();
        if let DisposeOutcome::Failed(ref error) = outcome {
            self.events
                .emit(&LifecycleEvent::disposal_failed(ctx, handle.id(), error.clone()));
        }
        debug!(context = %ctx, handle_id = %handle.id(), "Resource released");
        self.events.emit(&LifecycleEvent::released(ctx, handle.id()));
        outcome
    }
}

impl<F: ResourceFactory> std::fmt::Debug for ResourceRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("live_count", &self.live_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceKind;
    use crate::events::CollectingEventSink;
    use crate::testing::MockFactory;
    use uuid::Uuid;

    fn chromium() -> ResourceConfig {
        ResourceConfig::for_kind(ResourceKind::Chromium)
    }

    #[tokio::test]
    async fn test_acquire_then_current_returns_same_handle() {
        let registry = ResourceRegistry::new(MockFactory::new());

        let acquired = registry.acquire(&chromium()).await.unwrap();
        let current = registry.current().unwrap();

        assert!(Arc::ptr_eq(&acquired, &current));
        assert_eq!(registry.state(), HandleState::Live);
    }

    #[tokio::test]
    async fn test_second_acquire_reuses_handle() {
        let registry = ResourceRegistry::new(MockFactory::new());

        let first = registry.acquire(&chromium()).await.unwrap();
        let second = registry.acquire(&chromium()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.factory().create_count(), 1);
    }

    #[tokio::test]
    async fn test_release_disposes_and_clears() {
        let registry = ResourceRegistry::new(MockFactory::new());
        let handle = registry.acquire(&chromium()).await.unwrap();

        registry.release();

        assert!(handle.is_disposed());
        assert_eq!(registry.state(), HandleState::Uninitialized);
        assert!(matches!(registry.current(), Err(RegistryError::NotInitialized(_))));
    }

    #[test]
    fn test_release_without_acquire_is_noop() {
        let registry = ResourceRegistry::new(MockFactory::new());
        assert!(registry.release_for(ContextId::current()).is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_kind_stores_nothing() {
        let registry = ResourceRegistry::new(MockFactory::new());

        let err = registry.acquire(&ResourceConfig::new("unsupported")).await.unwrap_err();

        assert!(matches!(err, RegistryError::Configuration(_)));
        assert_eq!(registry.factory().create_count(), 0);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_even_with_a_live_handle() {
        let registry = ResourceRegistry::new(MockFactory::new());
        let held = registry.acquire(&chromium()).await.unwrap();

        let err = registry
            .acquire(&ResourceConfig::for_kind(ResourceKind::Remote))
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::Configuration(_)));
        assert!(Arc::ptr_eq(&registry.current().unwrap(), &held));
        assert_eq!(registry.factory().create_count(), 1);
    }

    #[tokio::test]
    async fn test_out_of_band_disposal_is_not_exposed() {
        let registry = ResourceRegistry::new(MockFactory::new());
        let handle = registry.acquire(&chromium()).await.unwrap();

        handle.dispose();

        assert!(registry.current().is_err());
        assert_eq!(registry.live_count(), 0);

        let fresh = registry.acquire(&chromium()).await.unwrap();
        assert!(!fresh.is_disposed());
        assert_ne!(fresh.id(), handle.id());
    }

    #[tokio::test]
    async fn test_release_all() {
        let registry = ResourceRegistry::new(MockFactory::new());
        let a = registry
            .acquire_for(ContextId::Task(Uuid::new_v4()), &chromium())
            .await
            .unwrap();
        let b = registry
            .acquire_for(ContextId::Task(Uuid::new_v4()), &chromium())
            .await
            .unwrap();

        assert_eq!(registry.release_all(), 2);
        assert!(a.is_disposed() && b.is_disposed());
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn test_events_follow_lifecycle() {
        let sink = Arc::new(CollectingEventSink::new());
        let registry = ResourceRegistry::new(MockFactory::new()).with_event_sink(sink.clone());

        registry.acquire(&chromium()).await.unwrap();
        registry.acquire(&chromium()).await.unwrap();
        registry.release();

        assert_eq!(
            sink.names(),
            vec!["resource.acquired", "resource.reused", "resource.released"]
        );
    }

    #[tokio::test]
    async fn test_disposal_failure_is_reported_not_raised() {
        let sink = Arc::new(CollectingEventSink::new());
        let registry = ResourceRegistry::new(MockFactory::new().failing_close())
            .with_event_sink(sink.clone());

        registry.acquire(&chromium()).await.unwrap();
        let outcome = registry.release_for(ContextId::current()).unwrap();

        assert!(matches!(outcome, DisposeOutcome::Failed(_)));
        assert_eq!(sink.count("resource.disposal_failed"), 1);
        assert_eq!(registry.state(), HandleState::Uninitialized);
    }
}
