//! Generic orchestration types shared by callers and adapters.
//!
//! Every adapter speaks this vocabulary on its public surface and translates to
//! its engine's native structures internally, so callers can swap engines
//! without changing call sites.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::retry::RetryOptions;

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// A workflow as registered with an adapter.
///
/// `implementation` is opaque to callers; each adapter validates it against
/// the shape its engine expects (for Temporal: an object carrying
/// `workflowType` and optionally `taskQueue`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub implementation: serde_json::Value,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Outcome of validating a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Build a result from the collected violations.
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

// ---------------------------------------------------------------------------
// Execution Options
// ---------------------------------------------------------------------------

/// Per-execution options supplied by the caller.
///
/// `retry` left as `None` is filled with engine defaults before submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOptions {
    /// Stable execution id. Defaults to `{workflow_id}-{unix_millis}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    /// 0-100, where 100 is the highest priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default)]
    pub resume_from_checkpoint: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpointing: Option<CheckpointingOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_constraints: Option<ResourceConstraints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancing_key: Option<String>,
}

impl ExecutionOptions {
    /// Whether checkpoints should be written for this execution.
    pub fn checkpointing_enabled(&self) -> bool {
        self.checkpointing.as_ref().is_some_and(|c| c.enabled)
    }
}

/// Checkpointing settings for one execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointingOptions {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence_level: Option<PersistenceLevel>,
}

/// Where the engine should keep checkpoint state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PersistenceLevel {
    Memory,
    Disk,
    #[default]
    Database,
}

/// Resource limits forwarded to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<f64>,
    /// Run timeout enforced by the engine, not the adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// Options for a standalone task submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Execution Result / Job Status
// ---------------------------------------------------------------------------

/// Returned synchronously from a submit call.
///
/// `status` is a point-in-time snapshot; poll the adapter for live state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub job_id: String,
    pub status: JobStatus,
    pub tracking_url: String,
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

/// Generic job state.
///
/// The execution lifecycle is `NOT_STARTED -> RUNNING -> {COMPLETED | FAILED |
/// CANCELLED | TIMED_OUT}`; "not started" has no job id and therefore no
/// `JobState`. `Pending` covers engine states this layer does not recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl JobState {
    /// Whether no further transitions happen without an explicit resume.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled | JobState::TimedOut
        )
    }
}

/// Status of a job as last reported by the engine. Never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub state: JobState,
    pub timestamps: JobTimestamps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTimestamps {
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Static feature flags an adapter advertises so callers can check before
/// invoking operations the backend cannot support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorCapabilities {
    pub parallel_execution: bool,
    pub child_workflows: bool,
    pub signal_workflows: bool,
    pub continued_execution: bool,
    pub state_queries: bool,
    pub versioning: bool,
    pub local_activities: bool,
    pub search_attributes: bool,
    pub retry_policies: bool,
    pub timeouts: bool,
}

impl OrchestratorCapabilities {
    /// Every capability enabled.
    pub const fn all() -> Self {
        Self {
            parallel_execution: true,
            child_workflows: true,
            signal_workflows: true,
            continued_execution: true,
            state_queries: true,
            versioning: true,
            local_activities: true,
            search_attributes: true,
            retry_policies: true,
            timeouts: true,
        }
    }
}
