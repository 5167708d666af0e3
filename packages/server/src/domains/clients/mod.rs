//! Clients domain - the people menus are planned for
//!
//! Commands: CreateClient
//! Events:   ClientCreated (audit), MenuAttachedToClient
//! Effects:  MenuCreated

pub mod actions;
pub mod commands;
pub mod effects;
pub mod events;
pub mod models;
pub mod queries;

use ladle::RegistryBuilder;

use crate::domains::audit::AuditLog;
use crate::domains::menus::events::MenuCreated;
use crate::kernel::uow::MenuUnitOfWork;

pub use commands::CreateClient;
pub use events::{ClientCreated, MenuAttachedToClient};
pub use models::Client;

pub fn register(registry: RegistryBuilder<MenuUnitOfWork>) -> RegistryBuilder<MenuUnitOfWork> {
    registry
        .require_command::<CreateClient>()
        .command::<CreateClient, _>(actions::CreateClientHandler)
        .event::<ClientCreated, _>(AuditLog)
        .event::<MenuCreated, _>(effects::AttachMenuToClient)
}
