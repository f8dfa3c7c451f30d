//! Shared domain types for flowguard.
//!
//! This crate contains the generic orchestration vocabulary shared by callers
//! and adapters (workflow definitions, execution options, job status), the
//! checkpoint and retry-policy records, the native engine vocabulary, and the
//! error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod retry;
pub mod workflow;
