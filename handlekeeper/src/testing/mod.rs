//! Testing utilities for code built on the registry.
//!
//! This module provides:
//! - MockFactory and MockResource with scriptable failures and delays
//! - Assertions for handle and registry state

mod assertions;
mod mocks;

pub use assertions::{assert_disposed, assert_live, assert_uninitialized};
pub use mocks::{MockFactory, MockResource};
