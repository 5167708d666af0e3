//! Recipe read side. Deleted recipes are invisible here.

use anyhow::Result;
use ladle::{Direction, Filter, Query, UnitOfWork, UnitOfWorkFactory};

use super::models::Recipe;
use crate::common::RecipeId;
use crate::kernel::uow::MenuUnitOfWorkFactory;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

pub async fn get_recipe(factory: &MenuUnitOfWorkFactory, id: RecipeId) -> Result<Option<Recipe>> {
    let mut uow = factory.begin().await?;
    let recipe = uow.recipes().get(id.into_uuid()).await;
    uow.close().await?;
    Ok(recipe?.filter(|r| !r.discarded))
}

/// Active recipes sorted by name, optionally carrying `tag`.
pub async fn list_recipes(
    factory: &MenuUnitOfWorkFactory,
    tag: Option<&str>,
    limit: Option<usize>,
    offset: usize,
) -> Result<Vec<Recipe>> {
    let (limit, offset) = page_bounds(limit, offset);
    let query = Query::new()
        .filter(active_filter(tag))
        .order_by("name", Direction::Asc)
        .limit(limit)
        .offset(offset);

    let mut uow = factory.begin().await?;
    let recipes = uow.recipes().query(&query).await;
    uow.close().await?;
    Ok(recipes?)
}

pub async fn count_recipes(factory: &MenuUnitOfWorkFactory, tag: Option<&str>) -> Result<u64> {
    let mut uow = factory.begin().await?;
    let count = uow.recipes().count(&active_filter(tag)).await;
    uow.close().await?;
    Ok(count?)
}

/// Page size capped at [`MAX_PAGE_SIZE`], offset capped to what the store
/// can address.
fn page_bounds(limit: Option<usize>, offset: usize) -> (usize, usize) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = offset.min(i64::MAX as usize);
    (limit, offset)
}

fn active_filter(tag: Option<&str>) -> Filter {
    let filter = Filter::new().eq("discarded", false);
    match tag {
        Some(tag) => filter.contains("tags", tag.trim().to_lowercase()),
        None => filter,
    }
}
