//! Shared test utilities
#![allow(dead_code)]

pub mod registry;

pub use registry::{StubRegistry, fresh_time, stale_time};
