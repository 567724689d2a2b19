//! Concurrent association from execution context to a single value.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use super::ContextId;

/// Map from [`ContextId`] to at most one shared value.
///
/// Backed by a sharded concurrent map: operations on one context lock only
/// that key's shard and never observe or affect another context's entry.
/// The store never disposes anything; a value displaced by [`set`](Self::set)
/// or [`remove`](Self::remove) is handed back to the caller.
pub struct ContextLocalStore<V> {
    entries: DashMap<ContextId, Arc<V>>,
}

impl<V> ContextLocalStore<V> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns the value stored for `ctx`, if any.
    pub fn get(&self, ctx: &ContextId) -> Option<Arc<V>> {
        self.entries.get(ctx).map(|entry| Arc::clone(entry.value()))
    }

    /// Associates `value` with `ctx`, returning the previous association.
    ///
    /// The previous value is not disposed.
    pub fn set(&self, ctx: ContextId, value: Arc<V>) -> Option<Arc<V>> {
        self.entries.insert(ctx, value)
    }

    /// Stores `value` only if `ctx` has no entry yet.
    ///
    /// Returns `Ok` with the stored value, or `Err` with the existing one and
    /// hands `value` back untouched so the caller can dispose it. The check
    /// and the insert happen under the key's shard lock.
    pub fn insert_if_absent(&self, ctx: ContextId, value: Arc<V>) -> Result<Arc<V>, (Arc<V>, Arc<V>)> {
        match self.entries.entry(ctx) {
            Entry::Occupied(existing) => Err((Arc::clone(existing.get()), value)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&value));
                Ok(value)
            }
        }
    }

    /// Removes and returns the value stored for `ctx`.
    pub fn remove(&self, ctx: &ContextId) -> Option<Arc<V>> {
        self.entries.remove(ctx).map(|(_, value)| value)
    }

    /// Removes `ctx` only if it still maps to `expected`.
    pub fn remove_if_same(&self, ctx: &ContextId, expected: &Arc<V>) -> Option<Arc<V>> {
        self.entries
            .remove_if(ctx, |_, value| Arc::ptr_eq(value, expected))
            .map(|(_, value)| value)
    }

    /// Returns true if `ctx` has an entry.
    #[must_use]
    pub fn contains(&self, ctx: &ContextId) -> bool {
        self.entries.contains_key(ctx)
    }

    /// Number of contexts with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no context has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the contexts that currently have an entry.
    #[must_use]
    pub fn contexts(&self) -> Vec<ContextId> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    /// Removes every entry and returns them.
    ///
    /// Entries inserted concurrently with the drain may survive it.
    pub fn drain(&self) -> Vec<(ContextId, Arc<V>)> {
        self.contexts()
            .into_iter()
            .filter_map(|ctx| self.entries.remove(&ctx))
            .collect()
    }
}

impl<V> Default for ContextLocalStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for ContextLocalStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLocalStore")
            .field("entries", &self.len())
            .finish()
    }
}
