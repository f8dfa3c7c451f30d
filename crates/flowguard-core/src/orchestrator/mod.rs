//! The consumer-facing orchestration contract and its engine adapters.
//!
//! Callers program against [`OrchestrationAdapter`] (or the type-erased
//! [`BoxOrchestrator`]); each engine gets its own implementation.

pub mod adapter;
pub mod box_orchestrator;
pub mod handlers;
pub mod resume;
pub mod temporal;

pub use adapter::{ErrorHandler, EventCallback, OrchestrationAdapter};
pub use box_orchestrator::BoxOrchestrator;
pub use handlers::ErrorHandlerRegistry;
pub use temporal::TemporalAdapter;
