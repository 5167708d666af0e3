//! # Ladle
//!
//! An in-process command/event bus with a transactional unit of work.
//!
//! ## Core Concepts
//!
//! Ladle separates **intent** from **facts**:
//! - [`Command`] = Intent (exactly one handler, one unit of work)
//! - [`Event`] = Facts (zero or more handlers, one unit of work each)
//!
//! The key principle: **One Command = One Handler = One Unit of Work**.
//! Aggregates record events in their [`EventLedger`]; writing an aggregate
//! through a [`Repository`] hands those events to the unit of work, and the
//! bus drains them once the handler returns.
//!
//! ## Architecture
//!
//! ```text
//! HTTP handler
//!     │
//!     ▼ bus.handle(command)
//! MessageBus ─── queue ──────────────────────────────┐
//!     │                                              │
//!     ├─► CommandHandler (own UoW, command timeout)  │
//!     │        └─► repository.add(aggregate) ──► events
//!     │                                              │
//!     └─► EventHandler × N (own UoW each,            │
//!              limiter permit, event timeout) ──► events
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Exactly-one dispatch** - every command runs exactly one handler
//! 2. **Rollback on exit** - every scope ends with rollback then close;
//!    only explicitly committed writes survive
//! 3. **Event isolation** - an event handler's failure, timeout or panic is
//!    reported and absorbed; siblings and the caller are unaffected
//! 4. **FIFO drain** - events are processed in the order they were recorded
//! 5. **In-process only** - no broker, no durability across restarts
//!
//! ## Example
//!
//! ```ignore
//! use ladle::{MessageBus, Registry, SessionUnitOfWorkFactory, InMemoryStore};
//!
//! let registry = Registry::builder()
//!     .command::<CreateWidget, _>(CreateWidgetHandler)
//!     .event::<WidgetCreated, _>(IndexWidget)
//!     .build()?;
//!
//! let factory = SessionUnitOfWorkFactory::new(Arc::new(InMemoryStore::new()));
//! let bus = MessageBus::builder(factory, registry).build();
//!
//! let id = bus.handle(CreateWidget { name: "bolt".into() }).await?;
//! ```

mod aggregate;
mod bus;
mod config;
mod core;
mod error;
mod handler;
mod limiter;
mod registry;
mod repository;
mod sink;

pub mod memory;
pub mod query;
pub mod session;
pub mod spawn;
pub mod uow;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Bus behavior tests (test-only)
#[cfg(test)]
mod scenario_tests;


// Re-export core traits
pub use crate::core::{
    Command, CommandEnvelope, CorrelationId, Event, EventEnvelope, Message, MessageType,
};

// Re-export error types
pub use crate::error::{
    is_write_conflict, BusError, Categorizable, RegistryError, SafeErrorCategory, StoreError,
};

// Re-export aggregate types
pub use aggregate::{Aggregate, EventLedger};

// Re-export handler types
pub use handler::{CommandHandler, EventHandler};

// Re-export registry types
pub use registry::{Registry, RegistryBuilder};

// Re-export persistence types
pub use memory::InMemoryStore;
pub use query::{Condition, Direction, Filter, Op, OrderBy, Query};
pub use repository::Repository;
pub use session::{Document, Session, SessionFactory};
pub use uow::{SessionUnitOfWork, SessionUnitOfWorkFactory, UnitOfWork, UnitOfWorkFactory};

// Re-export concurrency types
pub use limiter::{HandlerLimiter, LimiterPermit};
pub use spawn::{InlineSpawner, SpawnError, Spawner, Task, TokioSpawner};

// Re-export bus types
pub use bus::{AnyOutput, HandlerOutcome, MessageBus, MessageBusBuilder};
pub use config::BusConfig;
pub use sink::{FailureKind, FailureSink, HandlerFailure, TracingSink};

// Re-export commonly used external types
pub use async_trait::async_trait;
