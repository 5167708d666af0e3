//! Recipes domain - recipes built from catalog products, with user ratings
//!
//! Commands: CreateRecipe, RateRecipe, DeleteRecipe
//! Events:   RecipeCreated (audit), RecipeRated, RecipeDeleted (→ meals)

pub mod actions;
pub mod commands;
pub mod events;
pub mod models;
pub mod queries;

use ladle::RegistryBuilder;

use crate::domains::audit::AuditLog;
use crate::kernel::uow::MenuUnitOfWork;

pub use commands::{CreateRecipe, DeleteRecipe, RateRecipe};
pub use events::{RecipeCreated, RecipeDeleted, RecipeRated};
pub use models::{Ingredient, Rating, Recipe};

pub fn register(registry: RegistryBuilder<MenuUnitOfWork>) -> RegistryBuilder<MenuUnitOfWork> {
    registry
        .require_command::<CreateRecipe>()
        .require_command::<RateRecipe>()
        .require_command::<DeleteRecipe>()
        .command::<CreateRecipe, _>(actions::CreateRecipeHandler)
        .command::<RateRecipe, _>(actions::RateRecipeHandler)
        .command::<DeleteRecipe, _>(actions::DeleteRecipeHandler)
        .event::<RecipeCreated, _>(AuditLog)
}
