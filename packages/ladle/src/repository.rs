//! Typed repositories over a session.
//!
//! A [`Repository`] borrows its unit of work, so it can never outlive the
//! scope it was created in. Writing an aggregate through [`Repository::add`]
//! marks it as touched: its ledger is drained into the unit of work's
//! pending events at that moment.

use std::marker::PhantomData;

use tracing::trace;
use uuid::Uuid;

use crate::aggregate::Aggregate;
use crate::core::EventEnvelope;
use crate::error::StoreError;
use crate::query::{Filter, Query};
use crate::session::{Document, Session};

/// Typed access to one aggregate kind inside a unit of work.
pub struct Repository<'a, A> {
    session: &'a mut (dyn Session + 'static),
    pending: &'a mut Vec<EventEnvelope>,
    touched: &'a mut Vec<(&'static str, Uuid)>,
    _marker: PhantomData<fn() -> A>,
}

impl<'a, A: Aggregate> Repository<'a, A> {
    pub(crate) fn new(
        session: &'a mut (dyn Session + 'static),
        pending: &'a mut Vec<EventEnvelope>,
        touched: &'a mut Vec<(&'static str, Uuid)>,
    ) -> Self {
        Self {
            session,
            pending,
            touched,
            _marker: PhantomData,
        }
    }

    /// Load one aggregate by id.
    pub async fn get(&mut self, id: Uuid) -> Result<Option<A>, StoreError> {
        self.session
            .load(A::KIND, id)
            .await?
            .map(decode::<A>)
            .transpose()
    }

    /// Load several aggregates, in the order of `ids`, skipping missing ones.
    pub async fn get_many(&mut self, ids: &[Uuid]) -> Result<Vec<A>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.session
            .load_many(A::KIND, ids)
            .await?
            .into_iter()
            .map(decode::<A>)
            .collect()
    }

    /// Run a filtered, sorted, paged query.
    pub async fn query(&mut self, query: &Query) -> Result<Vec<A>, StoreError> {
        self.session
            .query(A::KIND, query)
            .await?
            .into_iter()
            .map(decode::<A>)
            .collect()
    }

    /// Count aggregates matching a filter.
    pub async fn count(&mut self, filter: &Filter) -> Result<u64, StoreError> {
        self.session.count(A::KIND, filter).await
    }

    /// Stage an aggregate for writing and harvest the events it recorded.
    ///
    /// Used both for new aggregates and for updates. Nothing is persisted
    /// until the unit of work commits.
    pub async fn add(&mut self, mut aggregate: A) -> Result<(), StoreError> {
        let id = aggregate.id();
        let document = serde_json::to_value(&aggregate)?;
        self.session.stage(A::KIND, id, document).await?;

        let events = aggregate.drain_events();
        trace!(kind = A::KIND, %id, events = events.len(), "aggregate staged");
        self.pending.extend(events);
        if !self.touched.contains(&(A::KIND, id)) {
            self.touched.push((A::KIND, id));
        }
        Ok(())
    }
}

fn decode<A: Aggregate>(document: Document) -> Result<A, StoreError> {
    serde_json::from_value(document).map_err(StoreError::from)
}
