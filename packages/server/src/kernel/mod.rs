//! Kernel module - persistence backends, the unit of work and bus wiring.

pub mod bootstrap;
pub mod postgres;
pub mod uow;

pub use bootstrap::{build_bus, build_registry, AppBus};
pub use postgres::PgStore;
pub use uow::{MenuUnitOfWork, MenuUnitOfWorkFactory, RepositoryExt};
