//! In-test doubles for the checkpoint store and execution engine ports.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use flowguard_types::checkpoint::Checkpoint;
use flowguard_types::engine::{EngineSignal, NativeDescription, NativeStartOptions, WorkflowHandle};
use flowguard_types::error::{EngineError, StoreError};
use tokio::sync::broadcast;

use crate::checkpoint::CheckpointStore;
use crate::engine::{ExecutionEngine, SignalBus};

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// Vec-backed store. Clones share state so tests can inspect what was saved.
#[derive(Clone, Default)]
pub struct MockStore {
    records: Arc<Mutex<Vec<Checkpoint>>>,
    fail_saves: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
    initialized: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl MockStore {
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Records for one execution in insertion order.
    pub fn records(&self, workflow_id: &str) -> Vec<Checkpoint> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|cp| cp.workflow_id == workflow_id)
            .cloned()
            .collect()
    }

    pub fn insert(&self, checkpoint: Checkpoint) {
        self.records.lock().unwrap().push(checkpoint);
    }

    fn ordered(&self, workflow_id: &str) -> Vec<Checkpoint> {
        let mut indexed: Vec<(usize, Checkpoint)> =
            self.records(workflow_id).into_iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));
        indexed.into_iter().map(|(_, cp)| cp).collect()
    }
}

impl CheckpointStore for MockStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Query("disk I/O error".to_string()));
        }
        self.insert(checkpoint.clone());
        Ok(())
    }

    async fn get_last(&self, workflow_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("database is locked".to_string()));
        }
        Ok(self.ordered(workflow_id).into_iter().next())
    }

    async fn history(&self, workflow_id: &str, limit: usize) -> Result<Vec<Checkpoint>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("database is locked".to_string()));
        }
        Ok(self.ordered(workflow_id).into_iter().take(limit).collect())
    }
}

// ---------------------------------------------------------------------------
// MockEngine
// ---------------------------------------------------------------------------

/// A recorded `start` call.
#[derive(Clone, Debug)]
pub struct StartCall {
    pub workflow_type: String,
    pub options: NativeStartOptions,
    pub input: serde_json::Value,
}

#[derive(Default)]
struct EngineState {
    start_error: Option<EngineError>,
    scripted_starts: VecDeque<(Duration, Option<EngineError>)>,
    cancel_error: Option<EngineError>,
    description: Option<NativeDescription>,
    unhealthy: bool,
    starts: Vec<StartCall>,
    cancels: Vec<String>,
}

/// Scriptable engine. Clones share state and the signal bus.
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<EngineState>>,
    bus: SignalBus,
    closed: Arc<AtomicBool>,
}

impl MockEngine {
    pub fn fail_start_with(&self, error: EngineError) {
        self.state.lock().unwrap().start_error = Some(error);
    }

    /// Queue the outcome of the next unscripted `start`, answered after `delay`.
    /// Scripted outcomes take precedence over [`MockEngine::fail_start_with`].
    pub fn script_start(&self, delay: Duration, error: Option<EngineError>) {
        self.state
            .lock()
            .unwrap()
            .scripted_starts
            .push_back((delay, error));
    }

    pub fn succeed_starts(&self) {
        self.state.lock().unwrap().start_error = None;
    }

    pub fn fail_cancel_with(&self, error: EngineError) {
        self.state.lock().unwrap().cancel_error = Some(error);
    }

    pub fn describe_as(&self, description: NativeDescription) {
        self.state.lock().unwrap().description = Some(description);
    }

    pub fn set_unhealthy(&self) {
        self.state.lock().unwrap().unhealthy = true;
    }

    pub fn starts(&self) -> Vec<StartCall> {
        self.state.lock().unwrap().starts.clone()
    }

    pub fn cancels(&self) -> Vec<String> {
        self.state.lock().unwrap().cancels.clone()
    }

    pub fn emit(&self, signal: EngineSignal) {
        self.bus.publish(signal);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ExecutionEngine for MockEngine {
    fn namespace(&self) -> &str {
        "default"
    }

    async fn start(
        &self,
        workflow_type: &str,
        options: &NativeStartOptions,
        input: &serde_json::Value,
    ) -> Result<WorkflowHandle, EngineError> {
        let (delay, outcome) = {
            let mut state = self.state.lock().unwrap();
            state.starts.push(StartCall {
                workflow_type: workflow_type.to_string(),
                options: options.clone(),
                input: input.clone(),
            });
            let (delay, error) = state
                .scripted_starts
                .pop_front()
                .unwrap_or_else(|| (Duration::ZERO, state.start_error.clone()));
            let outcome = match error {
                Some(err) => Err(err),
                None => Ok(WorkflowHandle {
                    id: options.workflow_id.clone(),
                    run_id: Some(format!("run-{}", state.starts.len())),
                    namespace: "default".to_string(),
                }),
            };
            (delay, outcome)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn describe(&self, workflow_id: &str) -> Result<NativeDescription, EngineError> {
        self.state
            .lock()
            .unwrap()
            .description
            .clone()
            .ok_or_else(|| EngineError::NotFound(workflow_id.to_string()))
    }

    async fn cancel(&self, workflow_id: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.cancels.push(workflow_id.to_string());
        match state.cancel_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn system_info(&self) -> Result<(), EngineError> {
        if self.state.lock().unwrap().unhealthy {
            return Err(EngineError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }

    fn signals(&self) -> broadcast::Receiver<EngineSignal> {
        self.bus.subscribe()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A description in the given native state, started a minute ago.
pub fn description(status: &str) -> NativeDescription {
    let start = Utc::now() - chrono::Duration::minutes(1);
    NativeDescription {
        status: status.to_string(),
        start_time: start,
        execution_time: Some(start),
        close_time: None,
        failure: None,
    }
}
