//! Execution-context identity and the per-context store.
//!
//! This module provides:
//! - ContextId for identifying threads and async task scopes
//! - ContextLocalStore for holding at most one value per context

mod identity;
mod store;

pub use identity::ContextId;
pub use store::ContextLocalStore;
