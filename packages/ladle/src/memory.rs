//! In-memory session backend.
//!
//! Committed documents live in a shared map; each session keeps its own
//! staged writes until commit. Used by tests and by hosts that run without a
//! database.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::query::{Filter, Query};
use crate::session::{Document, Session, SessionFactory};

/// A committed document and its version.
#[derive(Debug, Clone)]
struct Stored {
    version: u64,
    document: Document,
}

/// A staged document and the committed version it replaces.
#[derive(Debug, Clone)]
struct Staged {
    expected: Option<u64>,
    document: Document,
}

type Table = BTreeMap<Uuid, Stored>;

/// Shared in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<HashMap<&'static str, Table>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<&'static str, Table>>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Backend(format!("mutex poisoned: {}", e)))
    }

    /// Number of committed documents of one kind.
    pub fn committed_len(&self, kind: &str) -> usize {
        self.lock()
            .map(|tables| tables.get(kind).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// A committed document, bypassing any session.
    pub fn committed(&self, kind: &str, id: Uuid) -> Option<Document> {
        self.committed_row(kind, id).map(|row| row.document)
    }

    /// Version of a committed document. Starts at 1.
    pub fn committed_version(&self, kind: &str, id: Uuid) -> Option<u64> {
        self.committed_row(kind, id).map(|row| row.version)
    }

    fn committed_row(&self, kind: &str, id: Uuid) -> Option<Stored> {
        self.lock()
            .ok()
            .and_then(|tables| tables.get(kind).and_then(|t| t.get(&id)).cloned())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionFactory for InMemoryStore {
    async fn open(&self) -> Result<Box<dyn Session>, StoreError> {
        Ok(Box::new(InMemorySession {
            store: self.clone(),
            staged: HashMap::new(),
            seen: HashMap::new(),
            closed: false,
        }))
    }
}

/// Session over an [`InMemoryStore`].
///
/// Version checks happen at commit, under the store lock, so a commit either
/// applies every staged write or none.
pub struct InMemorySession {
    store: InMemoryStore,
    staged: HashMap<&'static str, BTreeMap<Uuid, Staged>>,
    /// Committed version of each document at its first read.
    seen: HashMap<(&'static str, Uuid), u64>,
    closed: bool,
}

impl InMemorySession {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn remember(&mut self, kind: &'static str, id: Uuid, version: u64) {
        self.seen.entry((kind, id)).or_insert(version);
    }

    /// Committed table with this session's staged writes laid over it.
    /// Committed rows carry their version, staged rows `None`.
    fn visible(
        &self,
        kind: &'static str,
    ) -> Result<BTreeMap<Uuid, (Option<u64>, Document)>, StoreError> {
        let mut table: BTreeMap<Uuid, (Option<u64>, Document)> = self
            .store
            .lock()?
            .get(kind)
            .map(|rows| {
                rows.iter()
                    .map(|(id, row)| (*id, (Some(row.version), row.document.clone())))
                    .collect()
            })
            .unwrap_or_default();
        if let Some(staged) = self.staged.get(kind) {
            table.extend(
                staged
                    .iter()
                    .map(|(id, row)| (*id, (None, row.document.clone()))),
            );
        }
        Ok(table)
    }
}

#[async_trait]
impl Session for InMemorySession {
    async fn load(&mut self, kind: &'static str, id: Uuid) -> Result<Option<Document>, StoreError> {
        self.ensure_open()?;
        if let Some(row) = self.staged.get(kind).and_then(|t| t.get(&id)) {
            return Ok(Some(row.document.clone()));
        }
        let row = self
            .store
            .lock()?
            .get(kind)
            .and_then(|t| t.get(&id))
            .cloned();
        Ok(row.map(|row| {
            self.remember(kind, id, row.version);
            row.document
        }))
    }

    async fn load_many(
        &mut self,
        kind: &'static str,
        ids: &[Uuid],
    ) -> Result<Vec<Document>, StoreError> {
        self.ensure_open()?;
        let mut table = self.visible(kind)?;
        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some((version, document)) = table.remove(id) {
                if let Some(version) = version {
                    self.remember(kind, *id, version);
                }
                documents.push(document);
            }
        }
        Ok(documents)
    }

    async fn query(&mut self, kind: &'static str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.ensure_open()?;
        let table = self.visible(kind)?;
        for (id, (version, document)) in &table {
            if let Some(version) = version {
                if query.filter.matches(document) {
                    self.remember(kind, *id, *version);
                }
            }
        }
        Ok(query.apply(table.into_values().map(|(_, document)| document)))
    }

    async fn count(&mut self, kind: &'static str, filter: &Filter) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let count = self
            .visible(kind)?
            .values()
            .filter(|(_, doc)| filter.matches(doc))
            .count();
        Ok(count as u64)
    }

    async fn stage(
        &mut self,
        kind: &'static str,
        id: Uuid,
        document: Document,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        // Restaging keeps the expectation of the first write.
        let expected = match self.staged.get(kind).and_then(|t| t.get(&id)) {
            Some(row) => row.expected,
            None => self.seen.get(&(kind, id)).copied(),
        };
        self.staged
            .entry(kind)
            .or_default()
            .insert(id, Staged { expected, document });
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut tables = self.store.lock()?;
        for (kind, rows) in &self.staged {
            let table = tables.get(kind);
            for (id, row) in rows {
                let current = table.and_then(|t| t.get(id)).map(|stored| stored.version);
                if current != row.expected {
                    return Err(StoreError::Conflict { kind: *kind, id: *id });
                }
            }
        }

        for (kind, rows) in std::mem::take(&mut self.staged) {
            let table = tables.entry(kind).or_default();
            for (id, Staged { expected, document }) in rows {
                let version = expected.map_or(1, |v| v + 1);
                table.insert(id, Stored { version, document });
                self.seen.insert((kind, id), version);
            }
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.staged.clear();
        self.seen.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.staged.clear();
        self.seen.clear();
        self.closed = true;
        Ok(())
    }
}
