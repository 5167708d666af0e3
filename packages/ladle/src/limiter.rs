//! Bound on concurrently running event handlers.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting semaphore shared by every event handler task.
///
/// Clones share the same permits, so one limiter can bound several bus
/// instances. A limit of `0` means unbounded.
#[derive(Clone, Default)]
pub struct HandlerLimiter {
    semaphore: Option<Arc<Semaphore>>,
    limit: usize,
}

impl HandlerLimiter {
    /// Limiter allowing at most `limit` handlers at once; `0` = unbounded.
    pub fn new(limit: usize) -> Self {
        if limit == 0 {
            return Self::unbounded();
        }
        Self {
            semaphore: Some(Arc::new(Semaphore::new(limit))),
            limit,
        }
    }

    /// Limiter that never blocks.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Configured limit, `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|_| self.limit)
    }

    /// Wait for a permit. The permit is released when dropped.
    pub async fn acquire(&self) -> LimiterPermit {
        match &self.semaphore {
            // The semaphore is never closed, so acquisition cannot fail.
            Some(semaphore) => LimiterPermit(semaphore.clone().acquire_owned().await.ok()),
            None => LimiterPermit(None),
        }
    }

    /// Permits currently free. Diagnostics only.
    pub fn available_permits(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }
}

impl std::fmt::Debug for HandlerLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerLimiter")
            .field("limit", &self.limit())
            .field("available", &self.available_permits())
            .finish()
    }
}

/// Held while an event handler runs.
#[derive(Debug)]
pub struct LimiterPermit(Option<OwnedSemaphorePermit>);

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_are_returned_on_drop() {
        let limiter = HandlerLimiter::new(2);
        let first = limiter.acquire().await;
        let _second = limiter.acquire().await;
        assert_eq!(limiter.available_permits(), Some(0));

        drop(first);
        assert_eq!(limiter.available_permits(), Some(1));
    }

    #[tokio::test]
    async fn test_zero_means_unbounded() {
        let limiter = HandlerLimiter::new(0);
        let _permits: Vec<_> = futures::future::join_all((0..64).map(|_| limiter.acquire())).await;

        assert_eq!(limiter.limit(), None);
        assert_eq!(limiter.available_permits(), None);
    }

    #[tokio::test]
    async fn test_clones_share_permits() {
        let limiter = HandlerLimiter::new(1);
        let clone = limiter.clone();
        let _held = limiter.acquire().await;

        assert_eq!(clone.available_permits(), Some(0));
    }
}
