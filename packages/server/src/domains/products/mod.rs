//! Products domain - the ingredient catalog recipes draw from
//!
//! Commands: AddProduct, UpdateProduct
//! Events:   ProductAdded, ProductUpdated (audit only)

pub mod actions;
pub mod commands;
pub mod events;
pub mod models;
pub mod queries;

use ladle::RegistryBuilder;

use crate::domains::audit::AuditLog;
use crate::kernel::uow::MenuUnitOfWork;

pub use commands::{AddProduct, UpdateProduct};
pub use events::{ProductAdded, ProductUpdated};
pub use models::{Product, ProductChanges};

pub fn register(registry: RegistryBuilder<MenuUnitOfWork>) -> RegistryBuilder<MenuUnitOfWork> {
    registry
        .require_command::<AddProduct>()
        .require_command::<UpdateProduct>()
        .command::<AddProduct, _>(actions::AddProductHandler)
        .command::<UpdateProduct, _>(actions::UpdateProductHandler)
        .event::<ProductAdded, _>(AuditLog)
}
