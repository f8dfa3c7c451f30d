//! HTTP client for the execution engine.
//!
//! Speaks the engine's JSON HTTP API:
//!
//! | Operation   | Request                                                   |
//! |-------------|-----------------------------------------------------------|
//! | start       | `POST /api/v1/namespaces/{ns}/workflows/{id}`             |
//! | describe    | `GET  /api/v1/namespaces/{ns}/workflows/{id}`             |
//! | cancel      | `POST /api/v1/namespaces/{ns}/workflows/{id}/cancel`      |
//! | system info | `GET  /api/v1/system-info`                                |
//!
//! Transport failures surface as `EngineError::Unavailable` with the full
//! error source chain as the message, so that the classifier sees the
//! underlying cause (e.g. "Connection refused").

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use flowguard_core::engine::execution::ExecutionEngine;
use flowguard_core::engine::signal::SignalBus;
use flowguard_types::config::AdapterConfig;
use flowguard_types::engine::{EngineSignal, NativeDescription, NativeStartOptions, WorkflowHandle};
use flowguard_types::error::EngineError;
use reqwest::{StatusCode, Url};
use tokio::sync::broadcast;

use super::wire::{DescribeWorkflowResponse, StartWorkflowRequest, StartWorkflowResponse};

/// Body fragment the engine uses when cancelling a closed execution.
const ALREADY_COMPLETED: &str = "already completed";

/// Engine client over HTTP.
pub struct HttpTemporalEngine {
    client: reqwest::Client,
    base_url: Url,
    namespace: String,
    signals: SignalBus,
    closed: AtomicBool,
}

impl HttpTemporalEngine {
    /// Build a client for the engine at `config.address`.
    ///
    /// An address without a scheme is treated as plain `http://`.
    pub fn new(config: &AdapterConfig) -> Result<Self, EngineError> {
        let address = if config.address.contains("://") {
            config.address.clone()
        } else {
            format!("http://{}", config.address)
        };
        let base_url = Url::parse(&address).map_err(|e| {
            EngineError::Protocol(format!("invalid engine address '{}': {e}", config.address))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(EngineError::Protocol(format!(
                "invalid engine address '{}'",
                config.address
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| EngineError::Protocol(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            namespace: config.namespace.clone(),
            signals: SignalBus::default(),
            closed: AtomicBool::new(false),
        })
    }

    /// Bus that signal producers (e.g. a webhook receiver) publish into.
    pub fn signal_bus(&self) -> &SignalBus {
        &self.signals
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.is_closed() {
            return Err(EngineError::Unavailable("engine client is closed".to_string()));
        }
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, EngineError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EngineError::Protocol(format!("invalid engine address '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn workflow_url(&self, workflow_id: &str, action: Option<&str>) -> Result<Url, EngineError> {
        let mut segments = vec!["api", "v1", "namespaces", self.namespace.as_str(), "workflows", workflow_id];
        segments.extend(action);
        self.endpoint(&segments)
    }
}

impl std::fmt::Debug for HttpTemporalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTemporalEngine")
            .field("base_url", &self.base_url.as_str())
            .field("namespace", &self.namespace)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Render an error and every source below it, outermost first.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn transport_error(err: reqwest::Error) -> EngineError {
    EngineError::Unavailable(error_chain(&err))
}

fn status_error(status: StatusCode, body: &str) -> EngineError {
    let message = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    };
    match status.as_u16() {
        404 => EngineError::NotFound(message),
        s if s >= 500 => EngineError::Unavailable(message),
        _ => EngineError::Rejected(message),
    }
}

/// Return the response if successful, otherwise a mapped error.
async fn check_status(
    response: reqwest::Response,
    operation: &str,
) -> Result<reqwest::Response, (StatusCode, String)> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, body = %body, operation, "engine API error response");
    Err((status, body))
}

// ---------------------------------------------------------------------------
// ExecutionEngine implementation
// ---------------------------------------------------------------------------

impl ExecutionEngine for HttpTemporalEngine {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn start(
        &self,
        workflow_type: &str,
        options: &NativeStartOptions,
        input: &serde_json::Value,
    ) -> Result<WorkflowHandle, EngineError> {
        self.ensure_open()?;
        let url = self.workflow_url(&options.workflow_id, None)?;
        let body = StartWorkflowRequest::new(workflow_type, options, input);

        tracing::debug!(url = %url, workflow_type, workflow_id = %options.workflow_id, "engine start request");

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, "start")
            .await
            .map_err(|(status, body)| status_error(status, &body))?;

        let started: StartWorkflowResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Protocol(format!("failed to parse start response: {e}")))?;

        Ok(WorkflowHandle {
            id: options.workflow_id.clone(),
            run_id: started.run_id,
            namespace: self.namespace.clone(),
        })
    }

    async fn describe(&self, workflow_id: &str) -> Result<NativeDescription, EngineError> {
        self.ensure_open()?;
        let url = self.workflow_url(workflow_id, None)?;

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let response = check_status(response, "describe")
            .await
            .map_err(|(status, body)| status_error(status, &body))?;

        let described: DescribeWorkflowResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Protocol(format!("failed to parse describe response: {e}")))?;

        Ok(described.into())
    }

    async fn cancel(&self, workflow_id: &str) -> Result<(), EngineError> {
        self.ensure_open()?;
        let url = self.workflow_url(workflow_id, Some("cancel"))?;

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(transport_error)?;

        match check_status(response, "cancel").await {
            Ok(_) => Ok(()),
            Err((status, body))
                if status == StatusCode::CONFLICT
                    || body.to_lowercase().contains(ALREADY_COMPLETED) =>
            {
                Err(EngineError::AlreadyTerminal(body))
            }
            Err((status, body)) => Err(status_error(status, &body)),
        }
    }

    async fn system_info(&self) -> Result<(), EngineError> {
        self.ensure_open()?;
        let url = self.endpoint(&["api", "v1", "system-info"])?;

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        check_status(response, "system_info")
            .await
            .map_err(|(status, body)| status_error(status, &body))?;
        Ok(())
    }

    fn signals(&self) -> broadcast::Receiver<EngineSignal> {
        self.signals.subscribe()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        tracing::debug!(base_url = %self.base_url, "engine client closed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
