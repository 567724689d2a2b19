//! Resource handle and its disposal state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

use super::NativeResource;
use crate::config::ResourceKind;
use crate::context::ContextId;

/// Lifecycle state of a context's resource.
///
/// `Uninitialized -> Live -> Disposed`; `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleState {
    /// No handle exists for the context.
    Uninitialized,
    /// The handle is usable.
    Live,
    /// The handle has been released.
    Disposed,
}

impl HandleState {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Live => "live",
            Self::Disposed => "disposed",
        }
    }
}

const LIVE: u8 = 1;
const DISPOSED: u8 = 2;

/// What a call to [`ResourceHandle::dispose`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisposeOutcome {
    /// This call closed the native resource.
    Disposed,
    /// An earlier call already disposed the handle.
    AlreadyDisposed,
    /// This call disposed the handle but closing the native side failed.
    ///
    /// The handle is still marked disposed.
    Failed(String),
}

impl DisposeOutcome {
    /// Returns true if this call performed the transition to `Disposed`.
    #[must_use]
    pub const fn transitioned(&self) -> bool {
        !matches!(self, Self::AlreadyDisposed)
    }
}

/// A live resource owned by one execution context.
///
/// Handles are shared as `Arc<ResourceHandle<R>>`. The native resource is
/// reachable through [`resource`](Self::resource) only while the handle is
/// live. A handle dropped while still live disposes itself.
pub struct ResourceHandle<R: NativeResource> {
    id: Uuid,
    kind: ResourceKind,
    context: ContextId,
    created_at: DateTime<Utc>,
    state: AtomicU8,
    resource: R,
}

impl<R: NativeResource> ResourceHandle<R> {
    /// Wraps a freshly created resource.
    #[must_use]
    pub fn new(resource: R, kind: ResourceKind, context: ContextId) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            context,
            created_at: Utc::now(),
            state: AtomicU8::new(LIVE),
            resource,
        }
    }

    /// Unique id of this handle.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The kind the handle was created as.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The context that owns the handle.
    #[must_use]
    pub const fn context(&self) -> ContextId {
        self.context
    }

    /// When the handle was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current lifecycle state. Never `Uninitialized`.
    #[must_use]
    pub fn state(&self) -> HandleState {
        if self.state.load(Ordering::Acquire) == DISPOSED {
            HandleState::Disposed
        } else {
            HandleState::Live
        }
    }

    /// Returns true once the handle has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state() == HandleState::Disposed
    }

    /// The native resource, or `None` after disposal.
    #[must_use]
    pub fn resource(&self) -> Option<&R> {
        if self.is_disposed() {
            None
        } else {
            Some(&self.resource)
        }
    }

    /// Releases the native resource.
    ///
    /// Idempotent: only the first call closes anything. Never fails and never
    /// panics; close errors and panics are logged and reported through the
    /// returned [`DisposeOutcome`].
    pub fn dispose(&self) -> DisposeOutcome {
        if self
            .state
            .compare_exchange(LIVE, DISPOSED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return DisposeOutcome::AlreadyDisposed;
        }

        if !self.resource.is_alive() {
            debug!(
                handle_id = %self.id,
                context = %self.context,
                "Native resource already gone before disposal"
            );
        }

        let closed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.resource.close()));

        match closed {
            Ok(Ok(())) => {
                debug!(handle_id = %self.id, context = %self.context, kind = %self.kind, "Resource disposed");
                DisposeOutcome::Disposed
            }
            Ok(Err(err)) => {
                warn!(handle_id = %self.id, context = %self.context, error = %err, "Resource disposal failed");
                DisposeOutcome::Failed(err.message)
            }
            Err(panic) => {
                let msg = panic_message(&*panic);
                warn!(handle_id = %self.id, context = %self.context, panic = %msg, "Resource close panicked");
                DisposeOutcome::Failed(msg)
            }
        }
    }
}

impl<R: NativeResource> Drop for ResourceHandle<R> {
    fn drop(&mut self) {
        if self.state.load(Ordering::Acquire) == LIVE {
            warn!(
                handle_id = %self.id,
                context = %self.context,
                "Resource handle dropped without release; disposing"
            );
            self.dispose();
        }
    }
}

impl<R: NativeResource> std::fmt::Debug for ResourceHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("context", &self.context)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "<non-string panic payload>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DisposalError;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[derive(Default)]
    struct Probe {
        closes: Arc<AtomicUsize>,
        fail: bool,
        panic: bool,
    }

    impl NativeResource for Probe {
        fn close(&self) -> Result<(), DisposalError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.panic {
                panic!("close exploded");
            }
            if self.fail {
                return Err(DisposalError::new("process already exited"));
            }
            Ok(())
        }
    }

    fn handle(probe: Probe) -> ResourceHandle<Probe> {
        ResourceHandle::new(probe, ResourceKind::Chromium, ContextId::current())
    }

    #[test]
    fn test_new_handle_is_live() {
        let h = handle(Probe::default());
        assert_eq!(h.state(), HandleState::Live);
        assert!(h.resource().is_some());
        assert_eq!(h.kind(), ResourceKind::Chromium);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let closes = Arc::new(AtomicUsize::new(0));
        let h = handle(Probe {
            closes: Arc::clone(&closes),
            ..Probe::default()
        });

        assert_eq!(h.dispose(), DisposeOutcome::Disposed);
        assert_eq!(h.dispose(), DisposeOutcome::AlreadyDisposed);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(h.is_disposed());
        assert!(h.resource().is_none());
    }

    #[test]
    fn test_dispose_swallows_close_error() {
        let h = handle(Probe {
            fail: true,
            ..Probe::default()
        });

        let outcome = h.dispose();
        assert_eq!(outcome, DisposeOutcome::Failed("process already exited".to_string()));
        assert!(outcome.transitioned());
        assert!(h.is_disposed());
    }

    #[test]
    fn test_dispose_swallows_close_panic() {
        let h = handle(Probe {
            panic: true,
            ..Probe::default()
        });

        assert_eq!(h.dispose(), DisposeOutcome::Failed("close exploded".to_string()));
        assert!(h.is_disposed());
    }

    #[test]
    fn test_drop_disposes_live_handle() {
        let closes = Arc::new(AtomicUsize::new(0));
        drop(handle(Probe {
            closes: Arc::clone(&closes),
            ..Probe::default()
        }));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_after_dispose_does_not_close_again() {
        let closes = Arc::new(AtomicUsize::new(0));
        let h = handle(Probe {
            closes: Arc::clone(&closes),
            ..Probe::default()
        });
        h.dispose();
        drop(h);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_dispose_closes_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let h = Arc::new(handle(Probe {
            closes: Arc::clone(&closes),
            ..Probe::default()
        }));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let h = Arc::clone(&h);
                std::thread::spawn(move || h.dispose())
            })
            .collect();
        let transitions = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(DisposeOutcome::transitioned)
            .count();

        assert_eq!(transitions, 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
