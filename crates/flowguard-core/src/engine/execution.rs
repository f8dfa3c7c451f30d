//! Execution engine trait definition.
//!
//! The engine is an external collaborator: it accepts opaque job descriptors,
//! returns a handle, and later reports a status. flowguard-infra provides the
//! HTTP client; tests use in-process mocks.

use flowguard_types::engine::{EngineSignal, NativeDescription, NativeStartOptions, WorkflowHandle};
use flowguard_types::error::EngineError;
use tokio::sync::broadcast;

/// Client for a durable execution engine.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ExecutionEngine: Send + Sync {
    /// Namespace every call is scoped to.
    fn namespace(&self) -> &str;

    /// Start an execution of `workflow_type` with the given native options.
    fn start(
        &self,
        workflow_type: &str,
        options: &NativeStartOptions,
        input: &serde_json::Value,
    ) -> impl std::future::Future<Output = Result<WorkflowHandle, EngineError>> + Send;

    /// Describe an execution by id.
    fn describe(
        &self,
        workflow_id: &str,
    ) -> impl std::future::Future<Output = Result<NativeDescription, EngineError>> + Send;

    /// Request cancellation of an execution.
    ///
    /// Fails with `EngineError::AlreadyTerminal` when the execution has
    /// already closed.
    fn cancel(
        &self,
        workflow_id: &str,
    ) -> impl std::future::Future<Output = Result<(), EngineError>> + Send;

    /// Cheap liveness probe.
    fn system_info(&self) -> impl std::future::Future<Output = Result<(), EngineError>> + Send;

    /// Subscribe to signals the engine emits. Only signals sent after this
    /// call are delivered.
    fn signals(&self) -> broadcast::Receiver<EngineSignal>;

    /// Release the client's connections. Final: later calls fail as unavailable.
    fn close(&self) -> impl std::future::Future<Output = ()> + Send;
}
