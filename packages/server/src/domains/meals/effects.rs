//! Meal domain effects - reactions to menu and recipe facts
//!
//! Cascade flow:
//!   MenuMealAdded → set meal.menu_id → MealAddedToMenu (terminal)
//!   RecipeDeleted → drop recipe from every meal → RecipeRemovedFromMeal (terminal)

use anyhow::Result;
use async_trait::async_trait;
use ladle::{EventHandler, Filter, Query, UnitOfWork};
use tracing::{debug, info};

use crate::domains::menus::events::MenuMealAdded;
use crate::domains::recipes::events::RecipeDeleted;
use crate::kernel::uow::{MenuUnitOfWork, RepositoryExt};

pub struct AssignMealToMenu;

#[async_trait]
impl EventHandler<MenuMealAdded, MenuUnitOfWork> for AssignMealToMenu {
    async fn handle(&self, event: &MenuMealAdded, uow: &mut MenuUnitOfWork) -> Result<()> {
        let mut meal = uow.meals().require(event.meal_id.into_uuid()).await?;
        if !meal.assign_to_menu(event.menu_id)? {
            debug!(meal_id = %event.meal_id, "meal already on menu");
            return Ok(());
        }

        uow.meals().add(meal).await?;
        uow.commit().await?;
        Ok(())
    }
}

pub struct RemoveDeletedRecipe;

#[async_trait]
impl EventHandler<RecipeDeleted, MenuUnitOfWork> for RemoveDeletedRecipe {
    async fn handle(&self, event: &RecipeDeleted, uow: &mut MenuUnitOfWork) -> Result<()> {
        let query = Query::new().filter(Filter::new().contains("recipe_ids", event.recipe_id));
        let meals = uow.meals().query(&query).await?;
        if meals.is_empty() {
            return Ok(());
        }

        let mut updated = 0;
        for mut meal in meals {
            if meal.remove_recipe(event.recipe_id) {
                uow.meals().add(meal).await?;
                updated += 1;
            }
        }
        uow.commit().await?;

        info!(recipe_id = %event.recipe_id, meals = updated, "deleted recipe removed from meals");
        Ok(())
    }
}
