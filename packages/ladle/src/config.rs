//! Bus configuration.

use std::time::Duration;

/// Tunables for a [`MessageBus`](crate::MessageBus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Upper bound on a command handler's run time.
    pub command_timeout: Duration,
    /// Upper bound on each event handler invocation.
    pub event_timeout: Duration,
    /// Maximum event handlers running at once; `0` = unbounded.
    pub concurrency_limit: usize,
    /// Maximum messages processed by one `handle()` call.
    pub max_messages: usize,
    /// How many times an event handler that lost a write conflict is rerun
    /// with a fresh unit of work.
    pub conflict_retries: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
            event_timeout: Duration::from_secs(10),
            concurrency_limit: 0,
            max_messages: 10_000,
            conflict_retries: 3,
        }
    }
}

impl BusConfig {
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_max_messages(mut self, max: usize) -> Self {
        self.max_messages = max;
        self
    }

    pub fn with_conflict_retries(mut self, retries: usize) -> Self {
        self.conflict_retries = retries;
        self
    }
}
