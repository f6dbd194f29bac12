//! Common test utilities for trial-dl integration tests

#[allow(dead_code)]
pub mod portal;

pub use portal::*;
