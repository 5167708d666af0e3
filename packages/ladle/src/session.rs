//! The storage boundary behind a unit of work.
//!
//! A [`Session`] is one transactional conversation with a backing store.
//! Documents are JSON values keyed by `(kind, id)`. Writes are staged until
//! `commit`; reads see the session's own staged writes.
//!
//! # Optimistic concurrency
//!
//! The store keeps a version per document, bumped on every committed write.
//! A session remembers the version of each document the first time it reads
//! it. Staging a document the session has read expects that version to still
//! be current; staging one it never read expects it not to exist yet. When
//! the expectation fails the backend returns [`StoreError::Conflict`], either
//! from `stage` or from `commit`, and the write is not applied.
//!
//! Backends implement [`SessionFactory`]. Ladle ships an in-memory backend
//! ([`crate::memory::InMemoryStore`]); applications plug in their own
//! (e.g. Postgres).

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;
use crate::query::{Filter, Query};

/// A stored aggregate.
pub type Document = Value;

/// One transactional conversation with a backing store.
///
/// Every method returns [`StoreError::Closed`] after `close`.
#[async_trait]
pub trait Session: Send {
    /// Load one document.
    async fn load(&mut self, kind: &'static str, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Load several documents, in the order of `ids`, skipping missing ones.
    async fn load_many(
        &mut self,
        kind: &'static str,
        ids: &[Uuid],
    ) -> Result<Vec<Document>, StoreError>;

    /// Run a query over one kind.
    async fn query(&mut self, kind: &'static str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Count documents of one kind matching a filter.
    async fn count(&mut self, kind: &'static str, filter: &Filter) -> Result<u64, StoreError>;

    /// Insert or replace a document. Not visible outside the session until commit.
    ///
    /// Fails with [`StoreError::Conflict`] when the stored version is not the
    /// one this session read (see the module docs).
    async fn stage(
        &mut self,
        kind: &'static str,
        id: Uuid,
        document: Document,
    ) -> Result<(), StoreError>;

    /// Persist staged writes, all or nothing. The session stays usable.
    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard staged writes and forget the versions read so far.
    async fn rollback(&mut self) -> Result<(), StoreError>;

    /// Release the session.
    async fn close(&mut self) -> Result<(), StoreError>;
}

/// Opens sessions. Shared by every unit of work the bus creates.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    async fn open(&self) -> Result<Box<dyn Session>, StoreError>;
}
