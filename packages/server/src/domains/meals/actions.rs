//! Meal command handlers.

use anyhow::Result;
use async_trait::async_trait;
use ladle::{CommandHandler, UnitOfWork};
use tracing::info;

use super::commands::{CreateMeal, UpdateMeal};
use super::models::Meal;
use crate::common::{DomainError, MealId};
use crate::kernel::uow::{MenuUnitOfWork, RepositoryExt};

pub struct CreateMealHandler;

#[async_trait]
impl CommandHandler<CreateMeal, MenuUnitOfWork> for CreateMealHandler {
    async fn handle(&self, cmd: CreateMeal, uow: &mut MenuUnitOfWork) -> Result<MealId> {
        let meal = Meal::create(cmd.author_id, &cmd.name, &cmd.description, cmd.recipe_ids)?;

        let wanted: Vec<_> = meal.recipe_ids.iter().map(|id| id.into_uuid()).collect();
        let found = uow.recipes().get_many(&wanted).await?;
        for id in &meal.recipe_ids {
            match found.iter().find(|r| r.id == *id) {
                None => return Err(DomainError::not_found("recipe", *id).into()),
                Some(recipe) if recipe.discarded => {
                    return Err(
                        DomainError::conflict(format!("recipe {id} has been deleted")).into(),
                    )
                }
                Some(_) => {}
            }
        }

        let id = meal.id;
        uow.meals().add(meal).await?;
        uow.commit().await?;

        info!(meal_id = %id, recipes = wanted.len(), "meal created");
        Ok(id)
    }
}

pub struct UpdateMealHandler;

#[async_trait]
impl CommandHandler<UpdateMeal, MenuUnitOfWork> for UpdateMealHandler {
    async fn handle(&self, cmd: UpdateMeal, uow: &mut MenuUnitOfWork) -> Result<bool> {
        let mut meal = uow.meals().require(cmd.meal_id.into_uuid()).await?;
        if !meal.update(cmd.name.as_deref(), cmd.description.as_deref())? {
            return Ok(false);
        }

        uow.meals().add(meal).await?;
        uow.commit().await?;
        Ok(true)
    }
}
