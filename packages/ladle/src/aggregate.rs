//! Aggregates and their domain event ledgers.
//!
//! Every aggregate owns an [`EventLedger`]: an append-only buffer of the
//! events its business operations recorded since it was loaded or created.
//! The ledger is never persisted. The unit of work drains it when the
//! aggregate is written through a repository, so each recorded event is
//! delivered at most once.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::core::{Event, EventEnvelope};

/// Append-only buffer of events recorded by one aggregate.
///
/// Embed it in the aggregate with `#[serde(skip)]`.
#[derive(Clone, Default)]
pub struct EventLedger {
    events: Vec<EventEnvelope>,
}

impl EventLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event. Order of recording is the order of delivery.
    pub fn record<E: Event>(&mut self, event: E) {
        self.events.push(EventEnvelope::new(event));
    }

    /// Take every recorded event, leaving the ledger empty.
    pub fn drain(&mut self) -> Vec<EventEnvelope> {
        std::mem::take(&mut self.events)
    }

    /// Recorded events not yet drained.
    pub fn pending(&self) -> &[EventEnvelope] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl fmt::Debug for EventLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLedger")
            .field("pending", &self.events.len())
            .finish()
    }
}

/// A consistency boundary persisted as one document.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Recipe {
///     pub id: RecipeId,
///     pub name: String,
///     pub version: i64,
///     #[serde(skip)]
///     ledger: EventLedger,
/// }
///
/// impl Aggregate for Recipe {
///     const KIND: &'static str = "recipe";
///
///     fn id(&self) -> Uuid {
///         self.id.into_uuid()
///     }
///
///     fn ledger_mut(&mut self) -> &mut EventLedger {
///         &mut self.ledger
///     }
/// }
/// ```
pub trait Aggregate: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name used by the storage backend.
    const KIND: &'static str;

    /// Identity of this aggregate within its kind.
    fn id(&self) -> Uuid;

    /// The aggregate's event ledger.
    fn ledger_mut(&mut self) -> &mut EventLedger;

    /// Drain the events recorded since the last drain.
    fn drain_events(&mut self) -> Vec<EventEnvelope> {
        self.ledger_mut().drain()
    }
}
