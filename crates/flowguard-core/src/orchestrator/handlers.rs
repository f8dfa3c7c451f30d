//! Ordered registry of submission-failure observers.

use std::sync::RwLock;

use flowguard_types::error::OrchestrationError;

use super::adapter::ErrorHandler;

/// Handlers run in registration order until one returns `true`.
///
/// Dispatch works on a snapshot of the list, so a handler may register
/// further handlers without deadlocking; those run from the next dispatch.
#[derive(Default)]
pub struct ErrorHandlerRegistry {
    handlers: RwLock<Vec<ErrorHandler>>,
}

impl ErrorHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: ErrorHandler) {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offer `error` to each handler in turn. Returns whether any handled it.
    pub fn dispatch(&self, error: &OrchestrationError) -> bool {
        let snapshot: Vec<ErrorHandler> = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for (index, handler) in snapshot.iter().enumerate() {
            if handler(error) {
                tracing::debug!(handler = index, "error handled");
                return true;
            }
        }
        false
    }
}

impl std::fmt::Debug for ErrorHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandlerRegistry")
            .field("handlers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_error() -> OrchestrationError {
        OrchestrationError::Submission {
            workflow_id: "wf".to_string(),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn empty_registry_handles_nothing() {
        let registry = ErrorHandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.dispatch(&sample_error()));
    }

    #[test]
    fn stops_at_first_handler_returning_true() {
        let registry = ErrorHandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        registry.register(Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            false
        }));
        let c = calls.clone();
        registry.register(Arc::new(move |_| {
            c.fetch_add(10, Ordering::SeqCst);
            true
        }));
        let c = calls.clone();
        registry.register(Arc::new(move |_| {
            c.fetch_add(100, Ordering::SeqCst);
            true
        }));

        assert!(registry.dispatch(&sample_error()));
        assert_eq!(calls.load(Ordering::SeqCst), 11);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn handlers_see_the_error() {
        let registry = ErrorHandlerRegistry::new();
        registry.register(Arc::new(|err| err.message() == "boom"));
        assert!(registry.dispatch(&sample_error()));
    }

    #[test]
    fn handler_may_register_another() {
        let registry = Arc::new(ErrorHandlerRegistry::new());
        let inner = registry.clone();
        registry.register(Arc::new(move |_| {
            inner.register(Arc::new(|_| true));
            false
        }));

        assert!(!registry.dispatch(&sample_error()));
        assert!(registry.dispatch(&sample_error()));
    }
}
