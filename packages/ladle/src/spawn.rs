//! Task groups for event handler fan-out.
//!
//! The bus never calls `tokio::spawn` directly. It hands the handler tasks of
//! one event to a [`Spawner`], which runs them all and reports every outcome.
//! Hosts choose the implementation:
//!
//! - [`TokioSpawner`]: one tokio task per handler. For long-running servers
//!   on a multi-threaded runtime.
//! - [`InlineSpawner`]: polls every task on the caller's task. For
//!   short-lived function hosts that must not leave work behind.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use thiserror::Error;

/// A unit of work for a spawner.
pub type Task<T> = BoxFuture<'static, T>;

/// Why a task produced no value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpawnError {
    /// The task panicked.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The runtime cancelled the task before it finished.
    #[error("task was cancelled")]
    Cancelled,
}

/// Runs a group of tasks to completion.
#[async_trait]
pub trait Spawner<T: Send + 'static>: Send + Sync + 'static {
    /// Launch every task and wait for all of them.
    ///
    /// A failing or panicking task never cancels its siblings. The returned
    /// vector is index-aligned with `tasks`.
    async fn run_all(&self, tasks: Vec<Task<T>>) -> Vec<Result<T, SpawnError>>;
}

/// Spawns each task on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

#[async_trait]
impl<T: Send + 'static> Spawner<T> for TokioSpawner {
    async fn run_all(&self, tasks: Vec<Task<T>>) -> Vec<Result<T, SpawnError>> {
        let handles: Vec<_> = tasks.into_iter().map(tokio::spawn).collect();
        join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.map_err(|e| {
                    if e.is_panic() {
                        SpawnError::Panicked(panic_message(&e.into_panic()))
                    } else {
                        SpawnError::Cancelled
                    }
                })
            })
            .collect()
    }
}

/// Polls every task concurrently on the calling task.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineSpawner;

#[async_trait]
impl<T: Send + 'static> Spawner<T> for InlineSpawner {
    async fn run_all(&self, tasks: Vec<Task<T>>) -> Vec<Result<T, SpawnError>> {
        // AssertUnwindSafe is required because boxed futures are not UnwindSafe
        let guarded = tasks
            .into_iter()
            .map(|task| AssertUnwindSafe(task).catch_unwind());
        join_all(guarded)
            .await
            .into_iter()
            .map(|result| result.map_err(|panic| SpawnError::Panicked(panic_message(&panic))))
            .collect()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
