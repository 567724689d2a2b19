//! Identity of the execution context that owns a handle.

use std::fmt;
use std::future::Future;
use std::thread::ThreadId;
use uuid::Uuid;

tokio::task_local! {
    static TASK_CONTEXT: Uuid;
}

/// Opaque identity of a concurrent unit of work.
///
/// Code running inside [`ContextId::scope`] is a `Task`. Any other tokio
/// task is identified by its runtime task id, which stays fixed when the
/// task migrates between worker threads. Everything else, including the
/// future driven by `block_on`, is identified by its [`ThreadId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextId {
    /// An OS thread outside any tokio task.
    Thread(ThreadId),
    /// An async task entered through [`ContextId::scope`].
    Task(Uuid),
    /// A spawned tokio task outside any explicit scope.
    Spawned(tokio::task::Id),
}

impl ContextId {
    /// Resolves the identity of the caller.
    ///
    /// Returns the enclosing task scope if there is one, then the running
    /// tokio task, and finally the current thread.
    #[must_use]
    pub fn current() -> Self {
        if let Ok(scoped) = TASK_CONTEXT.try_with(|id| Self::Task(*id)) {
            return scoped;
        }
        tokio::task::try_id().map_or_else(|| Self::Thread(std::thread::current().id()), Self::Spawned)
    }

    /// Runs `future` as a fresh task context.
    ///
    /// Nested scopes shadow the outer one for the duration of the inner future.
    pub async fn scope<F>(future: F) -> F::Output
    where
        F: Future,
    {
        TASK_CONTEXT.scope(Uuid::new_v4(), future).await
    }

    /// Runs `future` under a caller-chosen task id.
    ///
    /// Useful when a test harness already has a stable id for the unit of
    /// work and wants log lines to carry it.
    pub async fn scope_with<F>(id: Uuid, future: F) -> F::Output
    where
        F: Future,
    {
        TASK_CONTEXT.scope(id, future).await
    }

    /// Returns true if this identity belongs to an async task.
    #[must_use]
    pub const fn is_task(&self) -> bool {
        matches!(self, Self::Task(_) | Self::Spawned(_))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thread(id) => write!(f, "thread:{id:?}"),
            Self::Task(id) => write!(f, "task:{id}"),
            Self::Spawned(id) => write!(f, "tokio-task:{id}"),
        }
    }
}
