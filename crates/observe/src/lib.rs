//! Shared observability setup for the workspace's binaries and tests.

pub mod tracing;
