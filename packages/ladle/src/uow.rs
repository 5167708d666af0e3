//! Unit of work: one session, its repositories, and the events they harvested.
//!
//! # Lifecycle
//!
//! ```text
//! factory.begin()  ──►  handler uses repositories, calls commit() 0..n times
//!                              │
//!                              ▼
//!                  bus: collect_new_events() (on success)
//!                              │
//!                              ▼
//!                  bus: rollback() then close()   ← always, on every exit path
//! ```
//!
//! The bus owns the unit of work for the whole scope. Handlers never call
//! `rollback` or `close` themselves, and the bus never calls `commit`: writes
//! a handler does not commit are discarded.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::aggregate::Aggregate;
use crate::core::EventEnvelope;
use crate::error::StoreError;
use crate::repository::Repository;
use crate::session::{Session, SessionFactory};

/// A scoped transactional resource.
#[async_trait]
pub trait UnitOfWork: Send + 'static {
    /// Persist writes staged so far. The scope stays open.
    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard anything not committed.
    async fn rollback(&mut self) -> Result<(), StoreError>;

    /// Release the underlying session.
    async fn close(&mut self) -> Result<(), StoreError>;

    /// Events recorded by aggregates touched since the previous call, in
    /// touch order. Clears them.
    fn collect_new_events(&mut self) -> Vec<EventEnvelope>;
}

/// Creates a fresh unit of work per scope.
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync + 'static {
    type UnitOfWork: UnitOfWork;

    async fn begin(&self) -> Result<Self::UnitOfWork, StoreError>;
}

/// Unit of work over a [`Session`].
///
/// Applications usually wrap it to expose named repositories:
///
/// ```ignore
/// pub struct MenuUnitOfWork(SessionUnitOfWork);
///
/// impl MenuUnitOfWork {
///     pub fn recipes(&mut self) -> Repository<'_, Recipe> {
///         self.0.repository()
///     }
/// }
/// ```
pub struct SessionUnitOfWork {
    session: Box<dyn Session>,
    pending: Vec<EventEnvelope>,
    touched: Vec<(&'static str, Uuid)>,
}

impl SessionUnitOfWork {
    pub fn new(session: Box<dyn Session>) -> Self {
        Self {
            session,
            pending: Vec::new(),
            touched: Vec::new(),
        }
    }

    /// Repository for one aggregate kind, bound to this unit of work.
    pub fn repository<A: Aggregate>(&mut self) -> Repository<'_, A> {
        Repository::new(self.session.as_mut(), &mut self.pending, &mut self.touched)
    }

    /// Aggregates written during this scope, in first-touch order.
    pub fn touched(&self) -> &[(&'static str, Uuid)] {
        &self.touched
    }
}

#[async_trait]
impl UnitOfWork for SessionUnitOfWork {
    async fn commit(&mut self) -> Result<(), StoreError> {
        self.session.commit().await?;
        debug!(touched = self.touched.len(), "unit of work committed");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.session.rollback().await
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.session.close().await
    }

    fn collect_new_events(&mut self) -> Vec<EventEnvelope> {
        std::mem::take(&mut self.pending)
    }
}

impl std::fmt::Debug for SessionUnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionUnitOfWork")
            .field("touched", &self.touched.len())
            .field("pending_events", &self.pending.len())
            .finish_non_exhaustive()
    }
}

/// Factory for [`SessionUnitOfWork`].
#[derive(Clone)]
pub struct SessionUnitOfWorkFactory {
    sessions: Arc<dyn SessionFactory>,
}

impl SessionUnitOfWorkFactory {
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl UnitOfWorkFactory for SessionUnitOfWorkFactory {
    type UnitOfWork = SessionUnitOfWork;

    async fn begin(&self) -> Result<SessionUnitOfWork, StoreError> {
        Ok(SessionUnitOfWork::new(self.sessions.open().await?))
    }
}
