//! Temporal adapter.
//!
//! Drives the execution lifecycle against a Temporal-style engine:
//!
//! ```text
//! resume detection ─► policy computation ─► native submission
//!        │                                       │
//!   (last checkpoint,                   ok ──────┴────── err
//!    error classify)                    │                 │
//!                              initial checkpoint   failed checkpoint
//!                                       │                 │
//!                                 ExecutionResult   error handlers ─► re-raise
//! ```
//!
//! Checkpoint writes are best effort: a store failure is logged and never
//! masks the outcome of the submission itself.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use flowguard_types::checkpoint::{Checkpoint, CheckpointMetadata};
use flowguard_types::config::AdapterConfig;
use flowguard_types::engine::{
    CheckpointMemo, NativeRetryPolicy, NativeStartOptions, NativeWorkflowDefinition,
    PRIORITY_SEARCH_ATTRIBUTE,
};
use flowguard_types::error::{EngineError, OrchestrationError};
use flowguard_types::retry::{ErrorCategory, RetryOptions, RetryPolicy};
use flowguard_types::workflow::{
    ExecutionOptions, ExecutionResult, JobState, JobStatus, JobTimestamps,
    OrchestratorCapabilities, TaskOptions, ValidationResult, WorkflowDefinition,
};

use super::adapter::{ErrorHandler, EventCallback, OrchestrationAdapter};
use super::handlers::ErrorHandlerRegistry;
use super::resume;
use crate::checkpoint::{BoxCheckpointStore, CheckpointManager};
use crate::engine::ExecutionEngine;
use crate::retry::RetryPolicyEngine;
use crate::status::StatusTranslator;

/// Adapter name reported by [`OrchestrationAdapter::name`].
pub const ADAPTER_NAME: &str = "Temporal";

/// Checkpoint interval used when neither the options nor the config set one.
pub const DEFAULT_CHECKPOINT_INTERVAL_SECS: u64 = 60;

/// Highest accepted execution priority.
pub const MAX_PRIORITY: u8 = 100;

/// Wildcard event type for [`OrchestrationAdapter::subscribe_to_events`].
pub const ALL_EVENTS: &str = "*";

/// Metadata key/value stamped on definitions converted back from native form.
const SOURCE_KEY: &str = "source";
const SOURCE_TEMPORAL: &str = "temporal";

// ---------------------------------------------------------------------------
// TemporalAdapter
// ---------------------------------------------------------------------------

/// [`OrchestrationAdapter`] for a Temporal-style engine.
///
/// Generic over the engine client so tests can substitute an in-process
/// engine. Checkpointing is available only when a store is attached with
/// [`TemporalAdapter::with_checkpoint_store`].
///
/// [`OrchestrationAdapter::close`] is final: the engine client and the
/// checkpoint store are released for good, so a closed adapter refuses to
/// initialize again.
pub struct TemporalAdapter<E: ExecutionEngine> {
    config: AdapterConfig,
    engine: E,
    checkpoints: Option<CheckpointManager>,
    capabilities: OrchestratorCapabilities,
    registry: DashMap<String, WorkflowDefinition>,
    error_handlers: ErrorHandlerRegistry,
    initialized: AtomicBool,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl<E: ExecutionEngine> TemporalAdapter<E> {
    pub fn new(config: AdapterConfig, engine: E) -> Self {
        Self {
            config,
            engine,
            checkpoints: None,
            capabilities: OrchestratorCapabilities::all(),
            registry: DashMap::new(),
            error_handlers: ErrorHandlerRegistry::new(),
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Attach a checkpoint store. Initialised and closed with the adapter.
    pub fn with_checkpoint_store(mut self, store: BoxCheckpointStore) -> Self {
        self.checkpoints = Some(CheckpointManager::new(store));
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// The registered definition for `workflow_id`, if any.
    pub fn registered_workflow(&self, workflow_id: &str) -> Option<WorkflowDefinition> {
        self.registry.get(workflow_id).map(|entry| entry.value().clone())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_initialized(&self) -> Result<(), OrchestrationError> {
        if self.is_closed() {
            Err(OrchestrationError::Closed)
        } else if self.is_initialized() {
            Ok(())
        } else {
            Err(OrchestrationError::NotInitialized)
        }
    }

    // -----------------------------------------------------------------------
    // Definition conversion
    // -----------------------------------------------------------------------

    /// Convert a generic definition into the engine's shape.
    pub fn convert_to_native_format(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<NativeWorkflowDefinition, OrchestrationError> {
        let validation = self.validate_workflow_definition(definition);
        if !validation.valid {
            return Err(OrchestrationError::Validation {
                violations: validation.errors,
            });
        }

        let implementation = &definition.implementation;
        let mut violations = Vec::new();

        let retry_policy = match implementation.get("retryPolicy") {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value::<RetryOptions>(raw.clone()) {
                Ok(options) => Some(NativeRetryPolicy::from(&RetryPolicyEngine::effective_policy(
                    Some(&options),
                    None,
                ))),
                Err(e) => {
                    violations.push(format!("Invalid retryPolicy: {e}"));
                    None
                }
            },
        };

        let priority = match implementation.get("priority") {
            None | Some(Value::Null) => None,
            Some(raw) => match raw.as_u64().filter(|p| *p <= u64::from(MAX_PRIORITY)) {
                Some(p) => Some(p as u8),
                None => {
                    violations.push(format!(
                        "Priority must be an integer between 0 and {MAX_PRIORITY}"
                    ));
                    None
                }
            },
        };

        if !violations.is_empty() {
            return Err(OrchestrationError::Validation { violations });
        }

        Ok(NativeWorkflowDefinition {
            workflow_type: implementation_str(implementation, "workflowType")
                .unwrap_or(&definition.id)
                .to_string(),
            workflow_id: definition.id.clone(),
            task_queue: implementation_str(implementation, "taskQueue")
                .unwrap_or(&self.config.task_queue)
                .to_string(),
            retry_policy,
            priority,
        })
    }

    /// Convert an engine-shaped definition back to the generic form.
    pub fn convert_from_native_format(&self, native: &NativeWorkflowDefinition) -> WorkflowDefinition {
        let mut implementation = json!({
            "workflowType": native.workflow_type,
            "taskQueue": native.task_queue,
        });
        if let Some(policy) = &native.retry_policy {
            let policy = RetryPolicy::from(policy);
            let options = RetryOptions {
                max_attempts: policy.maximum_attempts,
                initial_interval_ms: policy.initial_interval_ms,
                maximum_interval_ms: policy.maximum_interval_ms,
                backoff_coefficient: policy.backoff_coefficient,
                non_retryable_error_types: policy.non_retryable_error_types,
                criticality_level: None,
            };
            implementation["retryPolicy"] = serde_json::to_value(&options).unwrap_or(Value::Null);
        }
        if let Some(priority) = native.priority {
            implementation["priority"] = json!(priority);
        }

        WorkflowDefinition {
            id: native.workflow_id.clone(),
            name: native.workflow_type.clone(),
            implementation,
            metadata: HashMap::from([(SOURCE_KEY.to_string(), json!(SOURCE_TEMPORAL))]),
        }
    }

    // -----------------------------------------------------------------------
    // Manual checkpoints
    // -----------------------------------------------------------------------

    /// Record caller-reported progress for an execution.
    ///
    /// Without a checkpoint store this only logs a warning.
    pub async fn save_workflow_checkpoint(
        &self,
        execution_id: &str,
        step: &str,
        data: Value,
        metadata: CheckpointMetadata,
    ) -> Result<(), OrchestrationError> {
        self.ensure_initialized()?;
        let Some(manager) = &self.checkpoints else {
            tracing::warn!(execution_id, step, "no checkpoint store configured, checkpoint dropped");
            return Ok(());
        };
        manager
            .checkpoint_progress(execution_id, step, data, metadata)
            .await?;
        Ok(())
    }

    /// The most recent checkpoint for an execution, if a store is configured.
    pub async fn get_last_workflow_checkpoint(
        &self,
        execution_id: &str,
    ) -> Result<Option<Checkpoint>, OrchestrationError> {
        self.ensure_initialized()?;
        match &self.checkpoints {
            Some(manager) => Ok(manager.last(execution_id).await?),
            None => Ok(None),
        }
    }

    /// Up to `limit` checkpoints for an execution, most recent first.
    pub async fn checkpoint_history(
        &self,
        execution_id: &str,
        limit: usize,
    ) -> Result<Vec<Checkpoint>, OrchestrationError> {
        self.ensure_initialized()?;
        match &self.checkpoints {
            Some(manager) => Ok(manager.history(execution_id, limit).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Whether an execution can be resumed from `checkpoint`.
    pub fn can_resume(checkpoint: &Checkpoint) -> bool {
        CheckpointManager::can_resume(checkpoint)
    }

    // -----------------------------------------------------------------------
    // Submission helpers
    // -----------------------------------------------------------------------

    /// Native workflow type and routing key for an execution.
    fn resolve_target(&self, workflow_id: &str, options: &ExecutionOptions) -> (String, String) {
        let (workflow_type, definition_queue) = match self.registry.get(workflow_id) {
            Some(entry) => {
                let implementation = &entry.value().implementation;
                (
                    implementation_str(implementation, "workflowType").map(str::to_string),
                    implementation_str(implementation, "taskQueue").map(str::to_string),
                )
            }
            None => {
                tracing::debug!(workflow_id, "workflow not registered, using id as workflow type");
                (None, None)
            }
        };

        let task_queue = options
            .load_balancing_key
            .clone()
            .or(definition_queue)
            .unwrap_or_else(|| self.config.task_queue.clone());

        (workflow_type.unwrap_or_else(|| workflow_id.to_string()), task_queue)
    }

    fn native_start_options(
        &self,
        execution_id: &str,
        task_queue: String,
        policy: &RetryPolicy,
        options: &ExecutionOptions,
    ) -> NativeStartOptions {
        let mut search_attributes = HashMap::new();
        if let Some(priority) = options.priority {
            search_attributes.insert(PRIORITY_SEARCH_ATTRIBUTE.to_string(), json!([priority]));
        }

        let memo = options
            .checkpointing
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| CheckpointMemo {
                checkpointing_enabled: true,
                checkpoint_interval: c
                    .interval_seconds
                    .or_else(|| self.config.checkpoint.as_ref().map(|cp| cp.interval_seconds))
                    .unwrap_or(DEFAULT_CHECKPOINT_INTERVAL_SECS),
                persistence_level: c.persistence_level.unwrap_or_default(),
            });

        NativeStartOptions {
            task_queue,
            workflow_id: execution_id.to_string(),
            workflow_run_timeout_secs: options
                .resource_constraints
                .as_ref()
                .and_then(|rc| rc.timeout_seconds),
            retry_policy: NativeRetryPolicy::from(policy),
            search_attributes,
            memo,
        }
    }

    /// Load the checkpoint to resume from.
    ///
    /// Only consulted when the caller asked to resume; a read failure is
    /// then fatal. Checkpoint writes re-read the last record themselves.
    async fn load_prior(
        &self,
        execution_id: &str,
        options: &ExecutionOptions,
    ) -> Result<Option<Checkpoint>, OrchestrationError> {
        if !options.resume_from_checkpoint {
            return Ok(None);
        }
        let Some(manager) = &self.checkpoints else {
            tracing::warn!(execution_id, "resume requested but no checkpoint store configured");
            return Ok(None);
        };
        Ok(manager.last(execution_id).await?)
    }
}

/// A non-empty string field of an implementation descriptor.
fn implementation_str<'a>(implementation: &'a Value, key: &str) -> Option<&'a str> {
    implementation
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn validate_options(options: &ExecutionOptions) -> Result<(), OrchestrationError> {
    let mut violations = Vec::new();

    if options.execution_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
        violations.push("Execution ID must not be empty".to_string());
    }
    if let Some(priority) = options.priority.filter(|p| *p > MAX_PRIORITY) {
        violations.push(format!(
            "Priority must be between 0 and {MAX_PRIORITY}, got {priority}"
        ));
    }
    if let Some(retry) = &options.retry {
        if retry.backoff_coefficient < 1.0 {
            violations.push(format!(
                "Backoff coefficient must be at least 1.0, got {}",
                retry.backoff_coefficient
            ));
        }
        if retry.initial_interval_ms > retry.maximum_interval_ms {
            violations.push(format!(
                "Initial interval ({} ms) exceeds maximum interval ({} ms)",
                retry.initial_interval_ms, retry.maximum_interval_ms
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(OrchestrationError::Validation { violations })
    }
}

// ---------------------------------------------------------------------------
// OrchestrationAdapter impl
// ---------------------------------------------------------------------------

impl<E: ExecutionEngine> OrchestrationAdapter for TemporalAdapter<E> {
    fn name(&self) -> &str {
        ADAPTER_NAME
    }

    fn version(&self) -> &str {
        &self.config.version
    }

    fn capabilities(&self) -> &OrchestratorCapabilities {
        &self.capabilities
    }

    async fn initialize(&self) -> Result<(), OrchestrationError> {
        if self.is_closed() {
            return Err(OrchestrationError::Closed);
        }
        if self.is_initialized() {
            return Ok(());
        }
        if let Some(manager) = &self.checkpoints {
            manager.initialize().await?;
        }
        self.initialized.store(true, Ordering::SeqCst);

        tracing::info!(
            adapter = ADAPTER_NAME,
            version = %self.config.version,
            namespace = %self.config.namespace,
            checkpointing = self.checkpoints.is_some(),
            "orchestration adapter initialized"
        );
        Ok(())
    }

    fn validate_workflow_definition(&self, definition: &WorkflowDefinition) -> ValidationResult {
        let mut errors = Vec::new();

        if definition.id.trim().is_empty() {
            errors.push("Workflow ID is required".to_string());
        }
        match &definition.implementation {
            Value::Null => errors.push("Workflow implementation is required".to_string()),
            Value::Object(_) => {
                if implementation_str(&definition.implementation, "workflowType").is_none() {
                    errors.push("Temporal workflow type (workflowType) is required".to_string());
                }
            }
            _ => errors.push("Workflow implementation must be an object".to_string()),
        }

        ValidationResult::from_errors(errors)
    }

    async fn register_workflow(&self, definition: WorkflowDefinition) -> Result<(), OrchestrationError> {
        let validation = self.validate_workflow_definition(&definition);
        if !validation.valid {
            tracing::warn!(
                workflow_id = %definition.id,
                violations = ?validation.errors,
                "rejected workflow definition"
            );
            return Err(OrchestrationError::Validation {
                violations: validation.errors,
            });
        }

        tracing::info!(
            workflow_id = %definition.id,
            name = %definition.name,
            "registered workflow"
        );
        self.registry.insert(definition.id.clone(), definition);
        Ok(())
    }

    async fn execute_workflow(
        &self,
        workflow_id: &str,
        input: Value,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult, OrchestrationError> {
        self.ensure_initialized()?;
        validate_options(&options)?;

        let execution_id = options
            .execution_id
            .clone()
            .unwrap_or_else(|| format!("{workflow_id}-{}", Utc::now().timestamp_millis()));
        let checkpointing = options.checkpointing_enabled() && self.checkpoints.is_some();
        if options.checkpointing_enabled() && self.checkpoints.is_none() {
            tracing::warn!(%execution_id, "checkpointing requested but no checkpoint store configured");
        }

        // 1. Resume detection
        let prior = self.load_prior(&execution_id, &options).await?;
        let mut input = input;
        let mut prior_failure: Option<BTreeSet<ErrorCategory>> = None;
        let mut resumed = false;

        if options.resume_from_checkpoint {
            match &prior {
                Some(checkpoint) => {
                    if !Self::can_resume(checkpoint) {
                        tracing::warn!(
                            %execution_id,
                            status = checkpoint.status.as_str(),
                            "resuming from a checkpoint that reports no remaining attempts"
                        );
                    }
                    prior_failure = resume::failure_categories(checkpoint);
                    input = resume::merge_into_input(input, checkpoint);
                    resumed = true;
                    tracing::info!(
                        %execution_id,
                        step = %checkpoint.step,
                        attempt = checkpoint.metadata.attempt_count,
                        categories = ?prior_failure,
                        "resuming from checkpoint"
                    );
                }
                None => {
                    tracing::info!(%execution_id, "no checkpoint found, starting fresh");
                }
            }
        }

        // 2. Policy and native options
        let policy = RetryPolicyEngine::effective_policy(options.retry.as_ref(), prior_failure.as_ref());
        let (workflow_type, task_queue) = self.resolve_target(workflow_id, &options);
        let native_options = self.native_start_options(&execution_id, task_queue, &policy, &options);

        // 3. Submission
        match self.engine.start(&workflow_type, &native_options, &input).await {
            Ok(handle) => {
                if let (true, Some(manager)) = (checkpointing, &self.checkpoints) {
                    if let Err(e) = manager.checkpoint_start(&execution_id, &input, &policy).await {
                        tracing::warn!(%execution_id, error = %e, "failed to save initial checkpoint");
                    }
                }

                tracing::info!(
                    %execution_id,
                    workflow_type = %workflow_type,
                    task_queue = %native_options.task_queue,
                    run_id = ?handle.run_id,
                    resumed,
                    "execution submitted"
                );

                let now = Utc::now();
                let tracking_url = format!(
                    "{}/workflows/{}/{}",
                    self.config.ui_address.trim_end_matches('/'),
                    handle.namespace,
                    handle.id
                );
                let context = HashMap::from([
                    ("namespace".to_string(), json!(handle.namespace)),
                    ("runId".to_string(), json!(handle.run_id)),
                    ("withCheckpointing".to_string(), json!(checkpointing)),
                    ("resumed".to_string(), json!(resumed)),
                ]);

                Ok(ExecutionResult {
                    job_id: handle.id,
                    status: JobStatus {
                        state: JobState::Running,
                        timestamps: JobTimestamps {
                            created: now,
                            started: Some(now),
                            completed: None,
                        },
                        error: None,
                    },
                    tracking_url,
                    context,
                })
            }
            Err(engine_error) => {
                let error = OrchestrationError::Submission {
                    workflow_id: workflow_id.to_string(),
                    message: engine_error.message().to_string(),
                };
                tracing::error!(
                    %execution_id,
                    workflow_type = %workflow_type,
                    error = %engine_error,
                    "execution submission failed"
                );

                if let (true, Some(manager)) = (checkpointing, &self.checkpoints) {
                    if let Err(e) = manager
                        .checkpoint_failure(&execution_id, &input, &error.message(), &policy)
                        .await
                    {
                        tracing::warn!(%execution_id, error = %e, "failed to save failure checkpoint");
                    }
                }

                self.error_handlers.dispatch(&error);
                Err(error)
            }
        }
    }

    async fn submit_task(
        &self,
        task_type: &str,
        data: Value,
        options: TaskOptions,
    ) -> Result<String, OrchestrationError> {
        self.ensure_initialized()?;
        let task_id = format!("{task_type}-{}", Utc::now().timestamp_millis());

        tracing::info!(
            task_id = %task_id,
            task_type,
            priority = ?options.priority,
            payload_bytes = data.to_string().len(),
            "task submitted; activities run inside engine workflows"
        );
        Ok(task_id)
    }

    async fn get_job_status(&self, job_id: &str) -> Result<JobStatus, OrchestrationError> {
        self.ensure_initialized()?;
        let description = self
            .engine
            .describe(job_id)
            .await
            .map_err(|e| OrchestrationError::Query {
                job_id: job_id.to_string(),
                message: e.message().to_string(),
            })?;
        Ok(StatusTranslator::translate(&description))
    }

    async fn cancel_job(&self, job_id: &str) -> Result<bool, OrchestrationError> {
        self.ensure_initialized()?;
        match self.engine.cancel(job_id).await {
            Ok(()) => {
                tracing::info!(job_id, "cancellation requested");
                Ok(true)
            }
            Err(EngineError::AlreadyTerminal(_)) => {
                tracing::debug!(job_id, "job already terminal, nothing to cancel");
                Ok(false)
            }
            Err(e) => Err(OrchestrationError::Query {
                job_id: job_id.to_string(),
                message: e.message().to_string(),
            }),
        }
    }

    fn subscribe_to_events(
        &self,
        entity_id: &str,
        event_type: &str,
        callback: EventCallback,
    ) -> Result<(), OrchestrationError> {
        self.ensure_initialized()?;

        let mut signals = self.engine.signals();
        let token = self.shutdown.clone();
        let entity_id = entity_id.to_string();
        let event_type = event_type.to_string();

        tracing::debug!(entity_id = %entity_id, event_type = %event_type, "subscribed to engine signals");

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    received = signals.recv() => match received {
                        Ok(signal) => {
                            if signal.entity_id == entity_id
                                && (event_type == ALL_EVENTS || signal.event_type == event_type)
                            {
                                callback(signal);
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(entity_id = %entity_id, skipped, "signal subscriber lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });
        Ok(())
    }

    fn register_error_handler(&self, handler: ErrorHandler) {
        self.error_handlers.register(handler);
    }

    async fn health_check(&self) -> bool {
        if !self.is_initialized() {
            return false;
        }
        match self.engine.system_info().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "engine health check failed");
                false
            }
        }
    }

    async fn close(&self) -> Result<(), OrchestrationError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shutdown.cancel();

        let store_result = match &self.checkpoints {
            Some(manager) => manager.close().await,
            None => Ok(()),
        };
        self.engine.close().await;
        self.initialized.store(false, Ordering::SeqCst);

        tracing::info!(adapter = ADAPTER_NAME, "orchestration adapter closed");
        store_result.map_err(Into::into)
    }
}

impl<E: ExecutionEngine> std::fmt::Debug for TemporalAdapter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporalAdapter")
            .field("namespace", &self.config.namespace)
            .field("initialized", &self.is_initialized())
            .field("closed", &self.is_closed())
            .field("registered", &self.registry.len())
            .field("checkpointing", &self.checkpoints.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
