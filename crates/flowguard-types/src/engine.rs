//! Native execution-engine vocabulary.
//!
//! These are the engine's own structures (field names and units as the engine
//! expects them), distinct from the generic types in [`crate::workflow`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;
use crate::workflow::PersistenceLevel;

/// Search attribute carrying the execution priority.
pub const PRIORITY_SEARCH_ATTRIBUTE: &str = "CustomIntField";

/// Retry policy in the engine's field names and units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeRetryPolicy {
    #[serde(rename = "initialIntervalInMilliseconds")]
    pub initial_interval_ms: u64,
    pub backoff_coefficient: f64,
    #[serde(rename = "maximumIntervalInMilliseconds")]
    pub maximum_interval_ms: u64,
    pub maximum_attempts: u32,
    #[serde(default)]
    pub non_retryable_error_types: Vec<String>,
}

impl From<&RetryPolicy> for NativeRetryPolicy {
    fn from(policy: &RetryPolicy) -> Self {
        Self {
            initial_interval_ms: policy.initial_interval_ms,
            backoff_coefficient: policy.backoff_coefficient,
            maximum_interval_ms: policy.maximum_interval_ms,
            maximum_attempts: policy.maximum_attempts,
            non_retryable_error_types: policy.non_retryable_error_types.clone(),
        }
    }
}

impl From<&NativeRetryPolicy> for RetryPolicy {
    fn from(native: &NativeRetryPolicy) -> Self {
        Self {
            maximum_attempts: native.maximum_attempts,
            initial_interval_ms: native.initial_interval_ms,
            maximum_interval_ms: native.maximum_interval_ms,
            backoff_coefficient: native.backoff_coefficient,
            non_retryable_error_types: native.non_retryable_error_types.clone(),
        }
    }
}

/// Options for the engine's start-execution primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeStartOptions {
    pub task_queue: String,
    pub workflow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_run_timeout_secs: Option<u64>,
    pub retry_policy: NativeRetryPolicy,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub search_attributes: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<CheckpointMemo>,
}

/// Memo annotation attached when checkpointing is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointMemo {
    pub checkpointing_enabled: bool,
    /// Seconds between engine-side checkpoints.
    pub checkpoint_interval: u64,
    pub persistence_level: PersistenceLevel,
}

/// Handle to a started execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowHandle {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub namespace: String,
}

/// The engine's description of an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeDescription {
    /// Native status name, e.g. `RUNNING`, `CANCELED`, `CONTINUED_AS_NEW`.
    pub status: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<NativeFailure>,
}

/// Failure payload attached to a failed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<NativeFailure>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A workflow definition in the engine's own shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeWorkflowDefinition {
    pub workflow_type: String,
    pub workflow_id: String,
    pub task_queue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<NativeRetryPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

/// A signal or event emitted by the engine for some entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSignal {
    pub entity_id: String,
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl EngineSignal {
    pub fn new(
        entity_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            event_type: event_type.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_retry_policy_uses_engine_field_names() {
        let native = NativeRetryPolicy::from(&RetryPolicy::default());
        let json = serde_json::to_value(&native).unwrap();
        assert_eq!(json["initialIntervalInMilliseconds"], 1000);
        assert_eq!(json["maximumIntervalInMilliseconds"], 60000);
        assert_eq!(json["maximumAttempts"], 5);
        assert_eq!(json["backoffCoefficient"], 2.0);
    }

    #[test]
    fn test_native_policy_converts_back() {
        let policy = RetryPolicy {
            maximum_attempts: 10,
            initial_interval_ms: 2_000,
            maximum_interval_ms: 300_000,
            backoff_coefficient: 1.5,
            non_retryable_error_types: vec!["SchemaError".to_string()],
        };
        let back = RetryPolicy::from(&NativeRetryPolicy::from(&policy));
        assert_eq!(back, policy);
    }

    #[test]
    fn test_failure_nests_cause() {
        let failure: NativeFailure = serde_json::from_value(serde_json::json!({
            "message": "activity failed",
            "cause": { "message": "E_SCHEMA" }
        }))
        .unwrap();
        assert_eq!(failure.cause.unwrap().message.as_deref(), Some("E_SCHEMA"));
    }
}
