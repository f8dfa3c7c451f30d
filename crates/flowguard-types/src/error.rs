use thiserror::Error;

/// Caller-facing errors raised by an orchestration adapter.
#[derive(Debug, Clone, Error)]
pub enum OrchestrationError {
    /// Registration-time or option validation failure. Lists every violation found.
    #[error("validation failed: {}", violations.join("; "))]
    Validation { violations: Vec<String> },

    /// The engine rejected (or never answered) the start call.
    #[error("submission of workflow '{workflow_id}' failed: {message}")]
    Submission { workflow_id: String, message: String },

    /// A status or cancel call against the engine failed.
    #[error("query for job '{job_id}' failed: {message}")]
    Query { job_id: String, message: String },

    /// Checkpoint persistence failure.
    #[error("checkpoint store error: {0}")]
    Store(String),

    #[error("adapter not initialized")]
    NotInitialized,

    /// The adapter was closed. Closing is final; build a new adapter instead.
    #[error("adapter closed")]
    Closed,
}

impl OrchestrationError {
    /// The underlying failure text, without the taxonomy prefix.
    ///
    /// This is what gets recorded as `lastError` in a failed checkpoint.
    pub fn message(&self) -> String {
        match self {
            OrchestrationError::Validation { violations } => violations.join("; "),
            OrchestrationError::Submission { message, .. } => message.clone(),
            OrchestrationError::Query { message, .. } => message.clone(),
            OrchestrationError::Store(message) => message.clone(),
            OrchestrationError::NotInitialized => "adapter not initialized".to_string(),
            OrchestrationError::Closed => "adapter closed".to_string(),
        }
    }
}

/// Errors reported by an execution engine client.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("engine rejected request: {0}")]
    Rejected(String),

    #[error("execution not found: {0}")]
    NotFound(String),

    #[error("execution already terminal: {0}")]
    AlreadyTerminal(String),

    #[error("engine protocol error: {0}")]
    Protocol(String),
}

impl EngineError {
    /// The engine-provided message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            EngineError::Unavailable(m)
            | EngineError::Rejected(m)
            | EngineError::NotFound(m)
            | EngineError::AlreadyTerminal(m)
            | EngineError::Protocol(m) => m,
        }
    }
}

/// Errors from checkpoint store operations (used by the port in flowguard-core).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store is closed")]
    Closed,
}

impl From<StoreError> for OrchestrationError {
    fn from(err: StoreError) -> Self {
        OrchestrationError::Store(err.to_string())
    }
}
