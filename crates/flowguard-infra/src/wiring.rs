//! Assemble a ready-to-use adapter from configuration.
//!
//! ```text
//! AdapterConfig ─► HttpTemporalEngine
//!               └► [checkpoint] ─► SqliteCheckpointStore | InMemoryCheckpointStore
//!                                      └──────────► TemporalAdapter
//! ```

use flowguard_core::checkpoint::box_store::BoxCheckpointStore;
use flowguard_core::orchestrator::temporal::TemporalAdapter;
use flowguard_types::config::AdapterConfig;
use flowguard_types::error::{EngineError, StoreError};
use thiserror::Error;

use crate::engine::HttpTemporalEngine;
use crate::memory::checkpoint::InMemoryCheckpointStore;
use crate::sqlite::checkpoint::SqliteCheckpointStore;

/// Database URL selecting the process-local checkpoint store.
pub const IN_MEMORY_DATABASE_URL: &str = "memory://";

/// Failures while assembling an adapter.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("engine client: {0}")]
    Engine(#[from] EngineError),

    #[error("checkpoint store: {0}")]
    Store(#[from] StoreError),
}

/// Build the checkpoint store named by `database_url`.
pub async fn connect_checkpoint_store(database_url: &str) -> Result<BoxCheckpointStore, StoreError> {
    if database_url == IN_MEMORY_DATABASE_URL {
        tracing::debug!("using in-memory checkpoint store");
        return Ok(BoxCheckpointStore::new(InMemoryCheckpointStore::new()));
    }
    let store = SqliteCheckpointStore::connect(database_url).await?;
    tracing::debug!(database_url, "using sqlite checkpoint store");
    Ok(BoxCheckpointStore::new(store))
}

/// Build a Temporal adapter over HTTP, with checkpointing when
/// `config.checkpoint` is set. The adapter still needs `initialize()`.
pub async fn connect_temporal_adapter(
    config: &AdapterConfig,
) -> Result<TemporalAdapter<HttpTemporalEngine>, SetupError> {
    let engine = HttpTemporalEngine::new(config)?;
    let mut adapter = TemporalAdapter::new(config.clone(), engine);

    if let Some(checkpoint) = &config.checkpoint {
        let store = connect_checkpoint_store(&checkpoint.database_url).await?;
        adapter = adapter.with_checkpoint_store(store);
    }

    tracing::info!(
        address = %config.address,
        namespace = %config.namespace,
        checkpointing = config.checkpoint.is_some(),
        "temporal adapter assembled"
    );
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use flowguard_core::orchestrator::adapter::OrchestrationAdapter;
    use flowguard_types::checkpoint::{CHECKPOINT_INPUT_KEY, CheckpointStatus};
    use flowguard_types::config::CheckpointConfig;
    use flowguard_types::error::OrchestrationError;
    use flowguard_types::retry::{CriticalityLevel, RetryOptions};
    use flowguard_types::workflow::{CheckpointingOptions, ExecutionOptions, JobState, WorkflowDefinition};
    use serde_json::{Value, json};

    #[derive(Clone, Default)]
    struct Engine {
        calls: Arc<AtomicUsize>,
        bodies: Arc<std::sync::Mutex<Vec<Value>>>,
    }

    /// Refuses the first start with a connection failure, accepts the rest.
    async fn start(
        State(engine): State<Engine>,
        Path((_ns, _id)): Path<(String, String)>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        engine.bodies.lock().unwrap().push(body);
        if engine.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"message": "upstream connection refused"})),
            );
        }
        (StatusCode::OK, Json(json!({"runId": "run-1"})))
    }

    async fn describe(Path((_ns, _id)): Path<(String, String)>) -> Json<Value> {
        Json(json!({
            "workflowExecutionInfo": {
                "status": "WORKFLOW_EXECUTION_STATUS_RUNNING",
                "startTime": "2026-03-01T10:00:00Z"
            }
        }))
    }

    async fn serve(engine: Engine) -> String {
        let app = Router::new()
            .route(
                "/api/v1/namespaces/{ns}/workflows/{id}",
                post(start).get(describe),
            )
            .with_state(engine);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn definition() -> WorkflowDefinition {
        WorkflowDefinition {
            id: "nightly-export".to_string(),
            name: "Nightly export".to_string(),
            implementation: json!({"workflowType": "ExportWorkflow", "taskQueue": "exports"}),
            metadata: Default::default(),
        }
    }

    fn options() -> ExecutionOptions {
        ExecutionOptions {
            execution_id: Some("export-2026-03-01".to_string()),
            checkpointing: Some(CheckpointingOptions {
                enabled: true,
                interval_seconds: None,
                persistence_level: None,
            }),
            retry: Some(RetryOptions::with_criticality(CriticalityLevel::High)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_failed_submission_resumes_from_sqlite_checkpoint() {
        let engine = Engine::default();
        let address = serve(engine.clone()).await;
        let dir = tempfile::tempdir().unwrap();

        let config = AdapterConfig {
            address,
            checkpoint: Some(CheckpointConfig {
                database_url: format!("sqlite://{}?mode=rwc", dir.path().join("cp.db").display()),
                interval_seconds: 30,
            }),
            ..AdapterConfig::default()
        };
        let adapter = connect_temporal_adapter(&config).await.unwrap();
        adapter.initialize().await.unwrap();
        adapter.register_workflow(definition()).await.unwrap();

        let err = adapter
            .execute_workflow("nightly-export", json!({"date": "2026-03-01"}), options())
            .await
            .unwrap_err();
        assert!(err.message().contains("connection refused"));

        let last = adapter
            .get_last_workflow_checkpoint("export-2026-03-01")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.status, CheckpointStatus::Failed);
        assert_eq!(last.metadata.attempt_count, 1);

        let mut resume = options();
        resume.resume_from_checkpoint = true;
        let result = adapter
            .execute_workflow("nightly-export", json!({"date": "2026-03-01"}), resume)
            .await
            .unwrap();
        assert_eq!(result.job_id, "export-2026-03-01");
        assert_eq!(result.context["resumed"], true);

        let bodies = engine.bodies.lock().unwrap().clone();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[1]["workflowType"], "ExportWorkflow");
        assert_eq!(bodies[1]["taskQueue"], "exports");
        assert_eq!(bodies[1]["memo"]["checkpointInterval"], 30);
        // High criticality keeps its floors; the connection failure doubles the first interval.
        assert_eq!(bodies[1]["retryPolicy"]["maximumAttempts"], 7);
        assert_eq!(bodies[1]["retryPolicy"]["initialIntervalInMilliseconds"], 2_000);
        let envelope = &bodies[1]["input"][CHECKPOINT_INPUT_KEY];
        assert_eq!(envelope["retryCount"], 2);
        assert_eq!(envelope["errorHistory"][0], last.metadata.last_error.clone().unwrap());

        let status = adapter.get_job_status("export-2026-03-01").await.unwrap();
        assert_eq!(status.state, JobState::Running);

        adapter.close().await.unwrap();
        assert!(matches!(adapter.initialize().await, Err(OrchestrationError::Closed)));
    }

    #[tokio::test]
    async fn test_in_memory_store_is_selected_by_url() {
        let config = AdapterConfig {
            checkpoint: Some(CheckpointConfig {
                database_url: IN_MEMORY_DATABASE_URL.to_string(),
                interval_seconds: 60,
            }),
            ..AdapterConfig::default()
        };
        let adapter = connect_temporal_adapter(&config).await.unwrap();
        adapter.initialize().await.unwrap();
        assert!(adapter
            .checkpoint_history("anything", 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_invalid_address_fails_setup() {
        let config = AdapterConfig {
            address: "http://".to_string(),
            ..AdapterConfig::default()
        };
        let err = connect_temporal_adapter(&config).await.unwrap_err();
        assert!(matches!(err, SetupError::Engine(EngineError::Protocol(_))));
    }
}
