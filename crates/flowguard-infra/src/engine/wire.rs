//! Request and response bodies of the engine's HTTP API.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use flowguard_types::engine::{
    CheckpointMemo, NativeDescription, NativeFailure, NativeRetryPolicy, NativeStartOptions,
};
use serde::{Deserialize, Serialize};

/// Prefix the HTTP API puts in front of every execution status.
pub const STATUS_PREFIX: &str = "WORKFLOW_EXECUTION_STATUS_";

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowRequest<'a> {
    pub workflow_type: &'a str,
    pub task_queue: &'a str,
    pub input: &'a serde_json::Value,
    /// Duration string such as `"3600s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_run_timeout: Option<String>,
    pub retry_policy: &'a NativeRetryPolicy,
    #[serde(skip_serializing_if = "no_attributes")]
    pub search_attributes: &'a HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<&'a CheckpointMemo>,
}

impl<'a> StartWorkflowRequest<'a> {
    pub fn new(
        workflow_type: &'a str,
        options: &'a NativeStartOptions,
        input: &'a serde_json::Value,
    ) -> Self {
        Self {
            workflow_type,
            task_queue: &options.task_queue,
            input,
            workflow_run_timeout: options.workflow_run_timeout_secs.map(|s| format!("{s}s")),
            retry_policy: &options.retry_policy,
            search_attributes: &options.search_attributes,
            memo: options.memo.as_ref(),
        }
    }
}

fn no_attributes(attributes: &&HashMap<String, serde_json::Value>) -> bool {
    attributes.is_empty()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowResponse {
    #[serde(default)]
    pub run_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Describe
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeWorkflowResponse {
    pub workflow_execution_info: WorkflowExecutionInfo,
    /// Failure of a closed execution. Older servers nest it in the info.
    #[serde(default)]
    pub failure: Option<NativeFailure>,
}

impl From<DescribeWorkflowResponse> for NativeDescription {
    fn from(response: DescribeWorkflowResponse) -> Self {
        let mut description = NativeDescription::from(response.workflow_execution_info);
        if response.failure.is_some() {
            description.failure = response.failure;
        }
        description
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecutionInfo {
    pub status: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub execution_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub close_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failure: Option<NativeFailure>,
}

impl From<WorkflowExecutionInfo> for NativeDescription {
    fn from(info: WorkflowExecutionInfo) -> Self {
        let status = info
            .status
            .strip_prefix(STATUS_PREFIX)
            .unwrap_or(&info.status)
            .to_string();
        Self {
            status,
            start_time: info.start_time,
            execution_time: info.execution_time,
            close_time: info.close_time,
            failure: info.failure,
        }
    }
}
