//! Meals domain - meals composed of recipes, planned onto menus
//!
//! Commands: CreateMeal, UpdateMeal
//! Events:   MealCreated (audit), MealUpdated (→ menus),
//!           MealAddedToMenu, RecipeRemovedFromMeal
//! Effects:  MenuMealAdded, RecipeDeleted

pub mod actions;
pub mod commands;
pub mod effects;
pub mod events;
pub mod models;
pub mod queries;

use ladle::RegistryBuilder;

use crate::domains::audit::AuditLog;
use crate::domains::menus::events::MenuMealAdded;
use crate::domains::recipes::events::RecipeDeleted;
use crate::kernel::uow::MenuUnitOfWork;

pub use commands::{CreateMeal, UpdateMeal};
pub use events::{MealAddedToMenu, MealCreated, MealUpdated, RecipeRemovedFromMeal};
pub use models::Meal;

pub fn register(registry: RegistryBuilder<MenuUnitOfWork>) -> RegistryBuilder<MenuUnitOfWork> {
    registry
        .require_command::<CreateMeal>()
        .require_command::<UpdateMeal>()
        .command::<CreateMeal, _>(actions::CreateMealHandler)
        .command::<UpdateMeal, _>(actions::UpdateMealHandler)
        .event::<MealCreated, _>(AuditLog)
        .event::<MenuMealAdded, _>(effects::AssignMealToMenu)
        .event::<RecipeDeleted, _>(effects::RemoveDeletedRecipe)
}
