//! BoxOrchestrator -- object-safe dynamic dispatch wrapper for
//! OrchestrationAdapter.
//!
//! 1. Define an object-safe `OrchestrationAdapterDyn` trait with boxed futures
//! 2. Blanket-impl `OrchestrationAdapterDyn` for all `T: OrchestrationAdapter`
//! 3. `BoxOrchestrator` wraps `Box<dyn OrchestrationAdapterDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use flowguard_types::error::OrchestrationError;
use flowguard_types::workflow::{
    ExecutionOptions, ExecutionResult, JobStatus, OrchestratorCapabilities, TaskOptions,
    ValidationResult, WorkflowDefinition,
};

use super::adapter::{ErrorHandler, EventCallback, OrchestrationAdapter};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`OrchestrationAdapter`] with boxed futures.
pub trait OrchestrationAdapterDyn: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn capabilities(&self) -> &OrchestratorCapabilities;

    fn initialize_boxed(&self) -> BoxFuture<'_, Result<(), OrchestrationError>>;

    fn validate_workflow_definition(&self, definition: &WorkflowDefinition) -> ValidationResult;

    fn register_workflow_boxed(
        &self,
        definition: WorkflowDefinition,
    ) -> BoxFuture<'_, Result<(), OrchestrationError>>;

    fn execute_workflow_boxed<'a>(
        &'a self,
        workflow_id: &'a str,
        input: serde_json::Value,
        options: ExecutionOptions,
    ) -> BoxFuture<'a, Result<ExecutionResult, OrchestrationError>>;

    fn submit_task_boxed<'a>(
        &'a self,
        task_type: &'a str,
        data: serde_json::Value,
        options: TaskOptions,
    ) -> BoxFuture<'a, Result<String, OrchestrationError>>;

    fn get_job_status_boxed<'a>(
        &'a self,
        job_id: &'a str,
    ) -> BoxFuture<'a, Result<JobStatus, OrchestrationError>>;

    fn cancel_job_boxed<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<bool, OrchestrationError>>;

    fn subscribe_to_events(
        &self,
        entity_id: &str,
        event_type: &str,
        callback: EventCallback,
    ) -> Result<(), OrchestrationError>;

    fn register_error_handler(&self, handler: ErrorHandler);

    fn health_check_boxed(&self) -> BoxFuture<'_, bool>;

    fn close_boxed(&self) -> BoxFuture<'_, Result<(), OrchestrationError>>;
}

impl<T: OrchestrationAdapter> OrchestrationAdapterDyn for T {
    fn name(&self) -> &str {
        OrchestrationAdapter::name(self)
    }

    fn version(&self) -> &str {
        OrchestrationAdapter::version(self)
    }

    fn capabilities(&self) -> &OrchestratorCapabilities {
        OrchestrationAdapter::capabilities(self)
    }

    fn initialize_boxed(&self) -> BoxFuture<'_, Result<(), OrchestrationError>> {
        Box::pin(self.initialize())
    }

    fn validate_workflow_definition(&self, definition: &WorkflowDefinition) -> ValidationResult {
        OrchestrationAdapter::validate_workflow_definition(self, definition)
    }

    fn register_workflow_boxed(
        &self,
        definition: WorkflowDefinition,
    ) -> BoxFuture<'_, Result<(), OrchestrationError>> {
        Box::pin(self.register_workflow(definition))
    }

    fn execute_workflow_boxed<'a>(
        &'a self,
        workflow_id: &'a str,
        input: serde_json::Value,
        options: ExecutionOptions,
    ) -> BoxFuture<'a, Result<ExecutionResult, OrchestrationError>> {
        Box::pin(self.execute_workflow(workflow_id, input, options))
    }

    fn submit_task_boxed<'a>(
        &'a self,
        task_type: &'a str,
        data: serde_json::Value,
        options: TaskOptions,
    ) -> BoxFuture<'a, Result<String, OrchestrationError>> {
        Box::pin(self.submit_task(task_type, data, options))
    }

    fn get_job_status_boxed<'a>(
        &'a self,
        job_id: &'a str,
    ) -> BoxFuture<'a, Result<JobStatus, OrchestrationError>> {
        Box::pin(self.get_job_status(job_id))
    }

    fn cancel_job_boxed<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<bool, OrchestrationError>> {
        Box::pin(self.cancel_job(job_id))
    }

    fn subscribe_to_events(
        &self,
        entity_id: &str,
        event_type: &str,
        callback: EventCallback,
    ) -> Result<(), OrchestrationError> {
        OrchestrationAdapter::subscribe_to_events(self, entity_id, event_type, callback)
    }

    fn register_error_handler(&self, handler: ErrorHandler) {
        OrchestrationAdapter::register_error_handler(self, handler)
    }

    fn health_check_boxed(&self) -> BoxFuture<'_, bool> {
        Box::pin(self.health_check())
    }

    fn close_boxed(&self) -> BoxFuture<'_, Result<(), OrchestrationError>> {
        Box::pin(self.close())
    }
}

/// Type-erased orchestrator for runtime engine selection.
///
/// Since `OrchestrationAdapter` uses RPITIT, it cannot be used as a trait
/// object directly. `BoxOrchestrator` provides equivalent methods that
/// delegate to the inner `OrchestrationAdapterDyn` trait object.
pub struct BoxOrchestrator {
    inner: Box<dyn OrchestrationAdapterDyn>,
}

impl BoxOrchestrator {
    /// Wrap a concrete adapter in a type-erased box.
    pub fn new<T: OrchestrationAdapter + 'static>(adapter: T) -> Self {
        Self {
            inner: Box::new(adapter),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn version(&self) -> &str {
        self.inner.version()
    }

    pub fn capabilities(&self) -> &OrchestratorCapabilities {
        self.inner.capabilities()
    }

    pub async fn initialize(&self) -> Result<(), OrchestrationError> {
        self.inner.initialize_boxed().await
    }

    pub fn validate_workflow_definition(&self, definition: &WorkflowDefinition) -> ValidationResult {
        self.inner.validate_workflow_definition(definition)
    }

    pub async fn register_workflow(&self, definition: WorkflowDefinition) -> Result<(), OrchestrationError> {
        self.inner.register_workflow_boxed(definition).await
    }

    pub async fn execute_workflow(
        &self,
        workflow_id: &str,
        input: serde_json::Value,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult, OrchestrationError> {
        self.inner.execute_workflow_boxed(workflow_id, input, options).await
    }

    pub async fn submit_task(
        &self,
        task_type: &str,
        data: serde_json::Value,
        options: TaskOptions,
    ) -> Result<String, OrchestrationError> {
        self.inner.submit_task_boxed(task_type, data, options).await
    }

    pub async fn get_job_status(&self, job_id: &str) -> Result<JobStatus, OrchestrationError> {
        self.inner.get_job_status_boxed(job_id).await
    }

    pub async fn cancel_job(&self, job_id: &str) -> Result<bool, OrchestrationError> {
        self.inner.cancel_job_boxed(job_id).await
    }

    pub fn subscribe_to_events(
        &self,
        entity_id: &str,
        event_type: &str,
        callback: EventCallback,
    ) -> Result<(), OrchestrationError> {
        self.inner.subscribe_to_events(entity_id, event_type, callback)
    }

    pub fn register_error_handler(&self, handler: ErrorHandler) {
        self.inner.register_error_handler(handler)
    }

    pub async fn health_check(&self) -> bool {
        self.inner.health_check_boxed().await
    }

    pub async fn close(&self) -> Result<(), OrchestrationError> {
        self.inner.close_boxed().await
    }
}

impl std::fmt::Debug for BoxOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxOrchestrator")
            .field("name", &self.inner.name())
            .field("version", &self.inner.version())
            .finish()
    }
}
