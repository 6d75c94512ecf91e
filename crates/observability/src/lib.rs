//! Tracing/logging setup shared by binaries, benches, and tests.

pub mod tracing;

pub use tracing::init;
