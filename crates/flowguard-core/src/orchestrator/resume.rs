//! Resume-from-checkpoint input preparation.
//!
//! A resumed execution receives the last checkpoint's state under the
//! `_checkpoint` key of its input, together with the error history of every
//! earlier attempt.

use std::collections::BTreeSet;

use flowguard_types::checkpoint::{CHECKPOINT_INPUT_KEY, Checkpoint, CheckpointEnvelope, CheckpointStatus};
use flowguard_types::retry::ErrorCategory;
use serde_json::{Map, Value};

use crate::classifier::ErrorClassifier;

/// Key a non-object input is moved under when the envelope is merged in.
pub const WRAPPED_INPUT_KEY: &str = "value";

/// Categories of the failure recorded by `checkpoint`, if it records one.
pub fn failure_categories(checkpoint: &Checkpoint) -> Option<BTreeSet<ErrorCategory>> {
    if checkpoint.status != CheckpointStatus::Failed {
        return None;
    }
    checkpoint
        .metadata
        .last_error
        .as_deref()
        .map(ErrorClassifier::classify)
}

/// Build the envelope a resumed execution receives.
///
/// History comes from the checkpoint's own data, falling back to whatever
/// the caller's input carries, and gains the checkpoint's last error. The
/// nested envelope inside the checkpoint data is dropped so that repeated
/// resumes do not nest envelopes.
pub fn envelope(input: &Value, checkpoint: &Checkpoint) -> CheckpointEnvelope {
    let mut error_history = checkpoint.error_history();
    if error_history.is_empty() {
        error_history = CheckpointEnvelope::history_from(input);
    }
    if let Some(last_error) = &checkpoint.metadata.last_error {
        error_history.push(last_error.clone());
    }

    let mut data = checkpoint.data.clone();
    if let Value::Object(map) = &mut data {
        map.remove(CHECKPOINT_INPUT_KEY);
    }

    CheckpointEnvelope {
        step: checkpoint.step.clone(),
        data,
        timestamp: checkpoint.timestamp,
        retry_count: checkpoint.metadata.attempt_count + 1,
        error_history,
    }
}

/// Merge the resume envelope for `checkpoint` into `input`.
///
/// Object inputs gain (or replace) the `_checkpoint` key. Null becomes an
/// object holding only the envelope; any other value moves under `value`.
pub fn merge_into_input(input: Value, checkpoint: &Checkpoint) -> Value {
    let envelope = envelope(&input, checkpoint);
    let envelope = serde_json::to_value(&envelope).unwrap_or(Value::Null);

    let mut map = match input {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert(WRAPPED_INPUT_KEY.to_string(), other);
            map
        }
    };
    map.insert(CHECKPOINT_INPUT_KEY.to_string(), envelope);
    Value::Object(map)
}
