//! Recipe command handlers.

use anyhow::Result;
use async_trait::async_trait;
use ladle::{CommandHandler, UnitOfWork};
use tracing::{debug, info};

use super::commands::{CreateRecipe, DeleteRecipe, RateRecipe};
use super::models::{Rating, Recipe};
use crate::common::{DomainError, RecipeId};
use crate::kernel::uow::{MenuUnitOfWork, RepositoryExt};

pub struct CreateRecipeHandler;

#[async_trait]
impl CommandHandler<CreateRecipe, MenuUnitOfWork> for CreateRecipeHandler {
    async fn handle(&self, cmd: CreateRecipe, uow: &mut MenuUnitOfWork) -> Result<RecipeId> {
        let recipe = Recipe::create(
            cmd.author_id,
            &cmd.name,
            &cmd.instructions,
            cmd.ingredients,
            cmd.tags,
        )?;

        let wanted = recipe.product_ids();
        let found = uow.products().get_many(&wanted).await?;
        if let Some(missing) = wanted
            .iter()
            .find(|id| !found.iter().any(|p| p.id.into_uuid() == **id))
        {
            return Err(DomainError::not_found("product", *missing).into());
        }

        let id = recipe.id;
        uow.recipes().add(recipe).await?;
        uow.commit().await?;

        info!(recipe_id = %id, ingredients = wanted.len(), "recipe created");
        Ok(id)
    }
}

pub struct RateRecipeHandler;

#[async_trait]
impl CommandHandler<RateRecipe, MenuUnitOfWork> for RateRecipeHandler {
    async fn handle(&self, cmd: RateRecipe, uow: &mut MenuUnitOfWork) -> Result<()> {
        let mut recipe = uow.recipes().require(cmd.recipe_id.into_uuid()).await?;
        recipe.rate(Rating {
            user_id: cmd.user_id,
            taste: cmd.taste,
            convenience: cmd.convenience,
            comment: cmd.comment,
        })?;

        debug!(
            recipe_id = %cmd.recipe_id,
            ratings = recipe.ratings.len(),
            average_taste = ?recipe.average_taste,
            "recipe rated"
        );
        uow.recipes().add(recipe).await?;
        uow.commit().await?;
        Ok(())
    }
}

pub struct DeleteRecipeHandler;

#[async_trait]
impl CommandHandler<DeleteRecipe, MenuUnitOfWork> for DeleteRecipeHandler {
    async fn handle(&self, cmd: DeleteRecipe, uow: &mut MenuUnitOfWork) -> Result<()> {
        let mut recipe = uow.recipes().require(cmd.recipe_id.into_uuid()).await?;
        recipe.delete()?;

        uow.recipes().add(recipe).await?;
        uow.commit().await?;

        info!(recipe_id = %cmd.recipe_id, "recipe deleted");
        Ok(())
    }
}
