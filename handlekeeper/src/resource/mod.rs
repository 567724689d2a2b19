//! Resource factories, native resources, and handles.
//!
//! This module provides:
//! - NativeResource and ResourceFactory, the traits providers implement
//! - ResourceHandle with its Live -> Disposed state machine

mod factory;
mod handle;

pub use factory::{NativeResource, ResourceFactory};
pub use handle::{DisposeOutcome, HandleState, ResourceHandle};
