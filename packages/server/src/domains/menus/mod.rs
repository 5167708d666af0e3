//! Menus domain - weekly plans of meals for a client
//!
//! Commands: CreateMenu, AddMealToMenu
//! Events:   MenuCreated (audit, → clients), MenuMealAdded (→ meals), MenuMealRenamed
//! Effects:  MealUpdated

pub mod actions;
pub mod commands;
pub mod effects;
pub mod events;
pub mod models;
pub mod queries;

use ladle::RegistryBuilder;

use crate::domains::audit::AuditLog;
use crate::domains::meals::events::MealUpdated;
use crate::kernel::uow::MenuUnitOfWork;

pub use commands::{AddMealToMenu, CreateMenu};
pub use events::{MenuCreated, MenuMealAdded, MenuMealRenamed};
pub use models::{MealType, Menu, MenuMeal, Slot, Weekday};

pub fn register(registry: RegistryBuilder<MenuUnitOfWork>) -> RegistryBuilder<MenuUnitOfWork> {
    registry
        .require_command::<CreateMenu>()
        .require_command::<AddMealToMenu>()
        .command::<CreateMenu, _>(actions::CreateMenuHandler)
        .command::<AddMealToMenu, _>(actions::AddMealToMenuHandler)
        .event::<MenuCreated, _>(AuditLog)
        .event::<MealUpdated, _>(effects::RenameMenuMeal)
}
