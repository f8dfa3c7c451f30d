//! Adapter configuration types.
//!
//! `AdapterConfig` represents the `flowguard.toml` that points the adapter at
//! an execution engine and, optionally, a checkpoint database.

use serde::{Deserialize, Serialize};

/// Top-level adapter configuration. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Base URL of the engine's HTTP API.
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Routing key used when neither the options nor the definition name one.
    #[serde(default = "default_task_queue")]
    pub task_queue: String,

    /// Base URL of the engine's web UI, used to build tracking URLs.
    #[serde(default = "default_ui_address")]
    pub ui_address: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Checkpoint persistence; checkpointing is unavailable when absent.
    #[serde(default)]
    pub checkpoint: Option<CheckpointConfig>,
}

fn default_address() -> String {
    "http://localhost:7243".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_task_queue() -> String {
    "default".to_string()
}

fn default_ui_address() -> String {
    "http://localhost:8088".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            namespace: default_namespace(),
            task_queue: default_task_queue(),
            ui_address: default_ui_address(),
            version: default_version(),
            request_timeout_secs: default_request_timeout_secs(),
            checkpoint: None,
        }
    }
}

/// Checkpoint store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// sqlx connection URL, e.g. `sqlite://./checkpoints.db?mode=rwc`.
    pub database_url: String,

    /// Default engine-side checkpoint interval in seconds.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

fn default_interval_seconds() -> u64 {
    60
}
