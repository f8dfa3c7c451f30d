//! Observability setup for flowguard processes.

pub mod tracing_setup;
