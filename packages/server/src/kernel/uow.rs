//! The application's unit of work: one session, one repository per aggregate.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use ladle::{
    Aggregate, EventEnvelope, InMemoryStore, Repository, SessionFactory, SessionUnitOfWork,
    StoreError, UnitOfWork, UnitOfWorkFactory,
};
use uuid::Uuid;

use crate::common::DomainError;
use crate::domains::clients::models::Client;
use crate::domains::meals::models::Meal;
use crate::domains::menus::models::Menu;
use crate::domains::products::models::Product;
use crate::domains::recipes::models::Recipe;

/// Unit of work handed to every command and event handler.
pub struct MenuUnitOfWork {
    inner: SessionUnitOfWork,
}

impl MenuUnitOfWork {
    pub fn new(inner: SessionUnitOfWork) -> Self {
        Self { inner }
    }

    pub fn products(&mut self) -> Repository<'_, Product> {
        self.inner.repository()
    }

    pub fn recipes(&mut self) -> Repository<'_, Recipe> {
        self.inner.repository()
    }

    pub fn meals(&mut self) -> Repository<'_, Meal> {
        self.inner.repository()
    }

    pub fn clients(&mut self) -> Repository<'_, Client> {
        self.inner.repository()
    }

    pub fn menus(&mut self) -> Repository<'_, Menu> {
        self.inner.repository()
    }
}

#[async_trait]
impl UnitOfWork for MenuUnitOfWork {
    async fn commit(&mut self) -> Result<(), StoreError> {
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.inner.rollback().await
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.inner.close().await
    }

    fn collect_new_events(&mut self) -> Vec<EventEnvelope> {
        self.inner.collect_new_events()
    }
}

/// Opens a [`MenuUnitOfWork`] per scope over a shared session backend.
#[derive(Clone)]
pub struct MenuUnitOfWorkFactory {
    sessions: Arc<dyn SessionFactory>,
}

impl MenuUnitOfWorkFactory {
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        Self { sessions }
    }

    /// Factory over a fresh in-memory store; the store is returned for inspection.
    pub fn in_memory() -> (Self, InMemoryStore) {
        let store = InMemoryStore::new();
        (Self::new(Arc::new(store.clone())), store)
    }
}

#[async_trait]
impl UnitOfWorkFactory for MenuUnitOfWorkFactory {
    type UnitOfWork = MenuUnitOfWork;

    async fn begin(&self) -> Result<MenuUnitOfWork, StoreError> {
        let session = self.sessions.open().await?;
        Ok(MenuUnitOfWork::new(SessionUnitOfWork::new(session)))
    }
}

/// Load-or-fail helpers for handlers.
#[async_trait]
pub trait RepositoryExt<A: Aggregate> {
    /// The aggregate, or `DomainError::NotFound` naming its kind.
    async fn require(&mut self, id: Uuid) -> Result<A>;
}

#[async_trait]
impl<A: Aggregate> RepositoryExt<A> for Repository<'_, A> {
    async fn require(&mut self, id: Uuid) -> Result<A> {
        match self.get(id).await? {
            Some(aggregate) => Ok(aggregate),
            None => Err(DomainError::not_found(A::KIND, id).into()),
        }
    }
}
