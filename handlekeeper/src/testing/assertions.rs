//! Test assertions for handles and registries.

use crate::context::ContextId;
use crate::registry::ResourceRegistry;
use crate::resource::{HandleState, NativeResource, ResourceFactory, ResourceHandle};

/// Asserts that the handle is live.
pub fn assert_live<R: NativeResource>(handle: &ResourceHandle<R>) {
    assert_eq!(
        handle.state(),
        HandleState::Live,
        "Expected handle {} to be live",
        handle.id()
    );
}

/// Asserts that the handle has been disposed.
pub fn assert_disposed<R: NativeResource>(handle: &ResourceHandle<R>) {
    assert!(
        handle.is_disposed(),
        "Expected handle {} to be disposed, got state: {:?}",
        handle.id(),
        handle.state()
    );
}

/// Asserts that `ctx` has no handle in `registry`.
pub fn assert_uninitialized<F: ResourceFactory>(registry: &ResourceRegistry<F>, ctx: ContextId) {
    let state = registry.state_for(ctx);
    assert_eq!(
        state,
        HandleState::Uninitialized,
        "Expected context {ctx} to hold no handle, got state: {state:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceKind;
    use crate::errors::DisposalError;

    struct Nothing;

    impl NativeResource for Nothing {
        fn close(&self) -> Result<(), DisposalError> {
            Ok(())
        }
    }

    #[test]
    fn test_assert_live_and_disposed() {
        let handle = ResourceHandle::new(Nothing, ResourceKind::Chromium, ContextId::current());
        assert_live(&handle);
        handle.dispose();
        assert_disposed(&handle);
    }

    #[test]
    #[should_panic(expected = "to be disposed")]
    fn test_assert_disposed_fails_on_live() {
        let handle = ResourceHandle::new(Nothing, ResourceKind::Chromium, ContextId::current());
        assert_disposed(&handle);
    }
}
