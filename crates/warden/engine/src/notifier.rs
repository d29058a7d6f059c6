//! Lifecycle event fan-out
//!
//! Consumers observe transitions, they never influence them: the engine
//! always writes the structured log, then offers the event to an
//! optional forwarder whose failures are swallowed with a warning.

use std::sync::Mutex;

use warden_types::OperationEvent;

pub trait EventForwarder: Send + Sync {
    fn forward(&self, event: &OperationEvent) -> Result<(), String>;
}

/// Collects forwarded events in memory; the test-side forwarder.
#[derive(Debug, Default)]
pub struct MemoryForwarder {
    events: Mutex<Vec<OperationEvent>>,
}

impl MemoryForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OperationEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<OperationEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventForwarder for MemoryForwarder {
    fn forward(&self, event: &OperationEvent) -> Result<(), String> {
        self.lock().push(event.clone());
        Ok(())
    }
}

/// Fails every delivery; exercises the swallowed-failure path in tests.
#[derive(Debug, Default)]
pub struct RefusingForwarder;

impl EventForwarder for RefusingForwarder {
    fn forward(&self, _event: &OperationEvent) -> Result<(), String> {
        Err("delivery refused".to_string())
    }
}
