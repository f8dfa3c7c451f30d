//! Broadcast bus for distributing `EngineSignal` to multiple subscribers.
//!
//! Built on `tokio::sync::broadcast`. Publishing with no active subscribers
//! is a no-op; slow subscribers observe `RecvError::Lagged` and skip ahead.

use flowguard_types::engine::EngineSignal;
use tokio::sync::broadcast;

/// Channel capacity used by engine clients unless configured otherwise.
pub const DEFAULT_SIGNAL_CAPACITY: usize = 1024;

/// Multi-consumer bus for engine signals.
///
/// Cloning the bus clones the sender, allowing multiple producers.
pub struct SignalBus {
    sender: broadcast::Sender<EngineSignal>,
}

impl SignalBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a subscriber that will receive all future signals.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineSignal> {
        self.sender.subscribe()
    }

    /// Publish a signal to all current subscribers.
    pub fn publish(&self, signal: EngineSignal) {
        let _ = self.sender.send(signal);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNAL_CAPACITY)
    }
}

impl Clone for SignalBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
