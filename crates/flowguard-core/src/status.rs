//! Translation from the engine's native status vocabulary to [`JobStatus`].

use flowguard_types::engine::NativeDescription;
use flowguard_types::workflow::{JobError, JobState, JobStatus, JobTimestamps};

/// Message used when a failed execution carries no failure message.
pub const UNKNOWN_FAILURE_MESSAGE: &str = "Unknown error";

/// Stateless native-status translation.
pub struct StatusTranslator;

impl StatusTranslator {
    /// Map a native status name to a generic state.
    ///
    /// Anything unrecognised (including `TERMINATED` and `CONTINUED_AS_NEW`)
    /// reads as `Pending`.
    pub fn map_state(native: &str) -> JobState {
        match native {
            "COMPLETED" => JobState::Completed,
            "RUNNING" => JobState::Running,
            "FAILED" => JobState::Failed,
            "CANCELED" | "CANCELLED" => JobState::Cancelled,
            "TIMED_OUT" => JobState::TimedOut,
            _ => JobState::Pending,
        }
    }

    /// Build a [`JobStatus`] from the engine's description of an execution.
    pub fn translate(description: &NativeDescription) -> JobStatus {
        let state = Self::map_state(&description.status);
        if state == JobState::Pending {
            tracing::warn!(
                native_status = %description.status,
                "unrecognised native status, reporting PENDING"
            );
        }

        let mut timestamps = JobTimestamps {
            created: description.start_time,
            started: Some(description.execution_time.unwrap_or(description.start_time)),
            completed: None,
        };
        let mut error = None;

        match state {
            JobState::Completed => {
                timestamps.completed = description.close_time;
            }
            JobState::Failed => {
                timestamps.completed = description.close_time;
                let failure = description.failure.as_ref();
                error = Some(JobError {
                    message: failure
                        .and_then(|f| f.message.clone())
                        .unwrap_or_else(|| UNKNOWN_FAILURE_MESSAGE.to_string()),
                    code: failure
                        .and_then(|f| f.cause.as_ref())
                        .and_then(|cause| cause.message.clone()),
                    details: failure.and_then(|f| serde_json::to_value(f).ok()),
                });
            }
            _ => {}
        }

        JobStatus {
            state,
            timestamps,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use flowguard_types::engine::NativeFailure;

    fn description(status: &str) -> NativeDescription {
        let start = Utc::now() - Duration::minutes(5);
        NativeDescription {
            status: status.to_string(),
            start_time: start,
            execution_time: Some(start + Duration::seconds(2)),
            close_time: Some(start + Duration::minutes(4)),
            failure: None,
        }
    }

    #[test]
    fn known_states_map_directly() {
        assert_eq!(StatusTranslator::map_state("COMPLETED"), JobState::Completed);
        assert_eq!(StatusTranslator::map_state("RUNNING"), JobState::Running);
        assert_eq!(StatusTranslator::map_state("FAILED"), JobState::Failed);
        assert_eq!(StatusTranslator::map_state("CANCELED"), JobState::Cancelled);
        assert_eq!(StatusTranslator::map_state("TIMED_OUT"), JobState::TimedOut);
    }

    #[test]
    fn unknown_states_are_pending() {
        assert_eq!(StatusTranslator::map_state("TERMINATED"), JobState::Pending);
        assert_eq!(StatusTranslator::map_state("CONTINUED_AS_NEW"), JobState::Pending);
        assert_eq!(StatusTranslator::map_state(""), JobState::Pending);
    }

    #[test]
    fn running_has_no_completion_time() {
        let desc = description("RUNNING");
        let status = StatusTranslator::translate(&desc);
        assert_eq!(status.state, JobState::Running);
        assert_eq!(status.timestamps.created, desc.start_time);
        assert_eq!(status.timestamps.started, desc.execution_time);
        assert!(status.timestamps.completed.is_none());
        assert!(status.error.is_none());
    }

    #[test]
    fn started_falls_back_to_start_time() {
        let mut desc = description("RUNNING");
        desc.execution_time = None;
        let status = StatusTranslator::translate(&desc);
        assert_eq!(status.timestamps.started, Some(desc.start_time));
    }

    #[test]
    fn completed_sets_completion_time() {
        let desc = description("COMPLETED");
        let status = StatusTranslator::translate(&desc);
        assert_eq!(status.timestamps.completed, desc.close_time);
        assert!(status.error.is_none());
    }

    #[test]
    fn failed_carries_error_details() {
        let mut desc = description("FAILED");
        desc.failure = Some(NativeFailure {
            message: Some("activity extractSchema failed".to_string()),
            cause: Some(Box::new(NativeFailure {
                message: Some("E_SCHEMA_MISMATCH".to_string()),
                cause: None,
                details: None,
            })),
            details: None,
        });
        let status = StatusTranslator::translate(&desc);
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.timestamps.completed, desc.close_time);
        let error = status.error.unwrap();
        assert_eq!(error.message, "activity extractSchema failed");
        assert_eq!(error.code.as_deref(), Some("E_SCHEMA_MISMATCH"));
        assert_eq!(
            error.details.unwrap()["cause"]["message"],
            "E_SCHEMA_MISMATCH"
        );
    }

    #[test]
    fn failed_without_failure_payload_uses_placeholder() {
        let status = StatusTranslator::translate(&description("FAILED"));
        let error = status.error.unwrap();
        assert_eq!(error.message, UNKNOWN_FAILURE_MESSAGE);
        assert!(error.code.is_none());
        assert!(error.details.is_none());
    }

    #[test]
    fn cancelled_and_timed_out_leave_completion_unset() {
        for native in ["CANCELED", "TIMED_OUT"] {
            let status = StatusTranslator::translate(&description(native));
            assert!(status.state.is_terminal());
            assert!(status.timestamps.completed.is_none());
        }
    }
}
