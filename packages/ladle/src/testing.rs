//! Test helpers.
//!
//! Enable the `testing` feature to use these from another crate's tests.

use std::sync::{Arc, Mutex};

use crate::sink::{FailureSink, HandlerFailure};

/// Failure sink that keeps every failure for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    failures: Arc<Mutex<Vec<HandlerFailure>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All failures reported so far.
    pub fn failures(&self) -> Vec<HandlerFailure> {
        self.failures
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.failures.lock().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FailureSink for RecordingSink {
    fn handler_failed(&self, failure: &HandlerFailure) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(failure.clone());
        }
    }
}
