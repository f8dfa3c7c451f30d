//! Execution engine clients.
//!
//! `HttpTemporalEngine` talks to the engine's HTTP API and implements
//! `ExecutionEngine` from `flowguard-core`.

pub mod http;
pub mod wire;

pub use http::HttpTemporalEngine;
