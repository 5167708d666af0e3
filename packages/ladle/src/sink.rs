//! Reporting of absorbed event handler failures.
//!
//! Event handler errors, timeouts and panics never reach the caller of
//! `handle()`. They are handed to a [`FailureSink`] instead. The default
//! [`TracingSink`] emits one structured `error!` record per failure; hosts
//! can plug in their own sink to forward failures to an alerting system.
//!
//! Sinks are called synchronously on the bus's task and must not block.

use std::fmt;
use std::time::Duration;

use tracing::error;

use crate::core::{CorrelationId, MessageType};

/// What went wrong inside one event handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The handler returned an error (rendered with its cause chain).
    Error(String),
    /// The handler exceeded the event timeout.
    TimedOut(Duration),
    /// The handler panicked.
    Panicked(String),
    /// The unit of work could not be opened.
    Store(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Error(message) => write!(f, "handler error: {message}"),
            FailureKind::TimedOut(timeout) => write!(f, "timed out after {timeout:?}"),
            FailureKind::Panicked(message) => write!(f, "panicked: {message}"),
            FailureKind::Store(message) => write!(f, "unit of work failed: {message}"),
        }
    }
}

/// One failed event handler invocation.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    /// The event being handled.
    pub message_type: MessageType,
    /// The handler's name.
    pub handler: &'static str,
    /// Correlation id of the `handle()` call.
    pub correlation_id: CorrelationId,
    /// Time from dispatch to failure.
    pub elapsed: Duration,
    /// The failure itself.
    pub kind: FailureKind,
}

/// Receives event handler failures.
pub trait FailureSink: Send + Sync + 'static {
    fn handler_failed(&self, failure: &HandlerFailure);
}

/// Logs failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn handler_failed(&self, failure: &HandlerFailure) {
        error!(
            event = %failure.message_type,
            handler = failure.handler,
            correlation_id = %failure.correlation_id,
            elapsed_ms = failure.elapsed.as_millis() as u64,
            failure = %failure.kind,
            "event handler failed"
        );
    }
}
