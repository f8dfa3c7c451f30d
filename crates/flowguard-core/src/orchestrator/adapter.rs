//! OrchestrationAdapter trait definition.
//!
//! Defines the interface every engine adapter implements. Callers depend on
//! this trait (or [`super::BoxOrchestrator`]) so that engines can be swapped
//! without touching call sites; optional features are discovered through
//! [`OrchestratorCapabilities`] rather than probing.

use std::sync::Arc;

use flowguard_types::engine::EngineSignal;
use flowguard_types::error::OrchestrationError;
use flowguard_types::workflow::{
    ExecutionOptions, ExecutionResult, JobStatus, OrchestratorCapabilities, TaskOptions,
    ValidationResult, WorkflowDefinition,
};

/// Callback invoked for each matching engine signal.
pub type EventCallback = Arc<dyn Fn(EngineSignal) + Send + Sync>;

/// Observer for submission failures. Returning `true` marks the error as
/// handled, which stops later handlers from running. The error is re-raised
/// to the caller either way.
pub type ErrorHandler = Arc<dyn Fn(&OrchestrationError) -> bool + Send + Sync>;

/// Generic orchestration contract.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait OrchestrationAdapter: Send + Sync {
    /// Human-readable adapter name (e.g. "Temporal").
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Static feature flags for this adapter instance.
    fn capabilities(&self) -> &OrchestratorCapabilities;

    /// Prepare the adapter for use. Must be called before submitting work.
    /// Fails with [`OrchestrationError::Closed`] once the adapter is closed.
    fn initialize(&self) -> impl std::future::Future<Output = Result<(), OrchestrationError>> + Send;

    /// Check a definition without registering it, collecting every violation.
    fn validate_workflow_definition(&self, definition: &WorkflowDefinition) -> ValidationResult;

    /// Validate and register a workflow definition.
    fn register_workflow(
        &self,
        definition: WorkflowDefinition,
    ) -> impl std::future::Future<Output = Result<(), OrchestrationError>> + Send;

    /// Submit an execution of a workflow.
    fn execute_workflow(
        &self,
        workflow_id: &str,
        input: serde_json::Value,
        options: ExecutionOptions,
    ) -> impl std::future::Future<Output = Result<ExecutionResult, OrchestrationError>> + Send;

    /// Submit a standalone task. Returns the task id.
    fn submit_task(
        &self,
        task_type: &str,
        data: serde_json::Value,
        options: TaskOptions,
    ) -> impl std::future::Future<Output = Result<String, OrchestrationError>> + Send;

    /// Query the engine for a job's current status.
    fn get_job_status(
        &self,
        job_id: &str,
    ) -> impl std::future::Future<Output = Result<JobStatus, OrchestrationError>> + Send;

    /// Best-effort cancel. `Ok(false)` when the job had already finished.
    fn cancel_job(
        &self,
        job_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, OrchestrationError>> + Send;

    /// Forward matching engine signals to `callback` until the adapter closes.
    ///
    /// `event_type` of `"*"` matches every signal for the entity.
    fn subscribe_to_events(
        &self,
        entity_id: &str,
        event_type: &str,
        callback: EventCallback,
    ) -> Result<(), OrchestrationError>;

    /// Append a submission-failure observer.
    fn register_error_handler(&self, handler: ErrorHandler);

    /// Whether the engine is reachable.
    fn health_check(&self) -> impl std::future::Future<Output = bool> + Send;

    /// Stop subscriptions and release the engine client and checkpoint store.
    /// Final: later calls to [`OrchestrationAdapter::initialize`] are rejected.
    fn close(&self) -> impl std::future::Future<Output = Result<(), OrchestrationError>> + Send;
}
