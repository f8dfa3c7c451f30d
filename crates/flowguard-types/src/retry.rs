//! Retry configuration, derived policies, and checkpointed retry snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base default: maximum attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Base default: first retry delay in milliseconds.
pub const DEFAULT_INITIAL_INTERVAL_MS: u64 = 1_000;
/// Base default: retry delay ceiling in milliseconds.
pub const DEFAULT_MAXIMUM_INTERVAL_MS: u64 = 60_000;
/// Base default: exponential backoff multiplier.
pub const DEFAULT_BACKOFF_COEFFICIENT: f64 = 2.0;

// ---------------------------------------------------------------------------
// Caller-supplied retry options
// ---------------------------------------------------------------------------

/// Caller-declared retry options for one execution.
///
/// Omitted fields fall back to the base defaults, so `{"criticalityLevel":
/// "HIGH"}` is a complete value. The config-style names (`maximumAttempts`,
/// `initialInterval`, `maximumInterval`) are accepted as aliases; supplying
/// both spellings of one field is a deserialization error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOptions {
    #[serde(default = "default_max_attempts", alias = "maximumAttempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_interval_ms", alias = "initialInterval")]
    pub initial_interval_ms: u64,
    #[serde(default = "default_maximum_interval_ms", alias = "maximumInterval")]
    pub maximum_interval_ms: u64,
    #[serde(default = "default_backoff_coefficient")]
    pub backoff_coefficient: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_retryable_error_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criticality_level: Option<CriticalityLevel>,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_initial_interval_ms() -> u64 {
    DEFAULT_INITIAL_INTERVAL_MS
}

fn default_maximum_interval_ms() -> u64 {
    DEFAULT_MAXIMUM_INTERVAL_MS
}

fn default_backoff_coefficient() -> f64 {
    DEFAULT_BACKOFF_COEFFICIENT
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_interval_ms: DEFAULT_INITIAL_INTERVAL_MS,
            maximum_interval_ms: DEFAULT_MAXIMUM_INTERVAL_MS,
            backoff_coefficient: DEFAULT_BACKOFF_COEFFICIENT,
            non_retryable_error_types: Vec::new(),
            criticality_level: None,
        }
    }
}

impl RetryOptions {
    /// Default options at the given criticality.
    pub fn with_criticality(level: CriticalityLevel) -> Self {
        Self {
            criticality_level: Some(level),
            ..Self::default()
        }
    }
}

/// Caller-declared importance tier that biases retry aggressiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CriticalityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for CriticalityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriticalityLevel::Low => write!(f, "LOW"),
            CriticalityLevel::Medium => write!(f, "MEDIUM"),
            CriticalityLevel::High => write!(f, "HIGH"),
            CriticalityLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ---------------------------------------------------------------------------
// Effective policy
// ---------------------------------------------------------------------------

/// The effective retry policy for a submission.
///
/// Derived per call; embedded in checkpoints and native submissions but never
/// persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub maximum_attempts: u32,
    pub initial_interval_ms: u64,
    pub maximum_interval_ms: u64,
    pub backoff_coefficient: f64,
    #[serde(default)]
    pub non_retryable_error_types: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryOptions::default())
    }
}

impl From<&RetryOptions> for RetryPolicy {
    fn from(opts: &RetryOptions) -> Self {
        Self {
            maximum_attempts: opts.max_attempts,
            initial_interval_ms: opts.initial_interval_ms,
            maximum_interval_ms: opts.maximum_interval_ms,
            backoff_coefficient: opts.backoff_coefficient,
            non_retryable_error_types: opts.non_retryable_error_types.clone(),
        }
    }
}

impl RetryPolicy {
    /// Snapshot this policy for embedding in a checkpoint.
    pub fn snapshot(&self, current_attempt: u32) -> RetryStrategySnapshot {
        RetryStrategySnapshot {
            max_attempts: self.maximum_attempts,
            initial_delay_ms: self.initial_interval_ms,
            max_delay_ms: self.maximum_interval_ms,
            backoff_coefficient: self.backoff_coefficient,
            current_attempt,
            last_attempt_time: Utc::now(),
        }
    }
}

/// Retry policy as recorded inside a checkpoint's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryStrategySnapshot {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_coefficient: f64,
    pub current_attempt: u32,
    pub last_attempt_time: DateTime<Utc>,
}

impl RetryStrategySnapshot {
    /// Whether the recorded attempts have used up the budget.
    pub fn is_exhausted(&self) -> bool {
        self.current_attempt >= self.max_attempts
    }
}

// ---------------------------------------------------------------------------
// Error categories
// ---------------------------------------------------------------------------

/// Category inferred from a failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Transient,
    Connection,
    Resource,
    Permission,
    Data,
    Generic,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Connection => "connection",
            ErrorCategory::Resource => "resource",
            ErrorCategory::Permission => "permission",
            ErrorCategory::Data => "data",
            ErrorCategory::Generic => "generic",
        };
        f.write_str(name)
    }
}
