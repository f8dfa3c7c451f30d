//! Execution engine port and the broadcast bus engines publish signals on.

pub mod execution;
pub mod signal;

pub use execution::ExecutionEngine;
pub use signal::SignalBus;
