//! Execution checkpoint records.
//!
//! Checkpoints are append-only snapshots of an execution's progress and last
//! failure, keyed by execution id. A resumed execution receives the last
//! checkpoint's state through the [`CheckpointEnvelope`] merged into its input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::retry::RetryStrategySnapshot;

/// Input key under which resume state is merged.
pub const CHECKPOINT_INPUT_KEY: &str = "_checkpoint";

/// Step label of the checkpoint written when an execution is first submitted.
pub const START_STEP: &str = "start";

/// A single persisted checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// UUIDv7, unique per record.
    pub id: Uuid,
    /// The execution id this checkpoint belongs to.
    pub workflow_id: String,
    pub timestamp: DateTime<Utc>,
    /// Free-form step label (e.g. "start", "extract-schema").
    pub step: String,
    pub status: CheckpointStatus,
    /// Opaque payload, passed through unmodified.
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub metadata: CheckpointMetadata,
}

impl Checkpoint {
    /// Create a new record stamped with a fresh id and the current time.
    pub fn new(
        workflow_id: impl Into<String>,
        step: impl Into<String>,
        status: CheckpointStatus,
        data: serde_json::Value,
        metadata: CheckpointMetadata,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            workflow_id: workflow_id.into(),
            timestamp: Utc::now(),
            step: step.into(),
            status,
            data,
            metadata,
        }
    }

    /// Error history recorded in this checkpoint's data by an earlier resume.
    pub fn error_history(&self) -> Vec<String> {
        CheckpointEnvelope::history_from(&self.data)
    }
}

/// Status of a checkpointed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    InProgress,
    Failed,
    Completed,
}

impl CheckpointStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckpointStatus::InProgress => "in_progress",
            CheckpointStatus::Failed => "failed",
            CheckpointStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for CheckpointStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(CheckpointStatus::InProgress),
            "failed" => Ok(CheckpointStatus::Failed),
            "completed" => Ok(CheckpointStatus::Completed),
            other => Err(format!("unknown checkpoint status: {other}")),
        }
    }
}

/// Typed checkpoint metadata.
///
/// `extra` keeps any caller-supplied fields from manual checkpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointMetadata {
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_strategy: Option<RetryStrategySnapshot>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Resume state merged into a resumed execution's input under `_checkpoint`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointEnvelope {
    pub step: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub retry_count: u32,
    #[serde(default)]
    pub error_history: Vec<String>,
}

impl CheckpointEnvelope {
    /// Read the `_checkpoint.errorHistory` list out of an input document.
    ///
    /// Missing or malformed history reads as empty.
    pub fn history_from(value: &serde_json::Value) -> Vec<String> {
        value
            .get(CHECKPOINT_INPUT_KEY)
            .and_then(|cp| cp.get("errorHistory"))
            .and_then(|h| h.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
