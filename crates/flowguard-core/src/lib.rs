//! Retry policy engine, checkpoint ports, and orchestration adapters for
//! flowguard.
//!
//! This crate defines the "ports" (checkpoint store and execution engine
//! traits) that the infrastructure layer implements. It depends only on
//! `flowguard-types` -- never on `flowguard-infra` or any database/IO crate.

pub mod checkpoint;
pub mod classifier;
pub mod engine;
pub mod orchestrator;
pub mod retry;
pub mod status;

#[cfg(test)]
mod testing;
