use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{created, Created};
use crate::common::{RecipeId, UserId};
use crate::domains::recipes::{queries, CreateRecipe, DeleteRecipe, RateRecipe, Recipe};
use crate::server::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct RecipeFilter {
    pub tag: Option<String>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Serialize)]
pub struct RecipePage {
    pub items: Vec<Recipe>,
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct RateRecipeRequest {
    pub user_id: UserId,
    pub taste: u8,
    pub convenience: u8,
    pub comment: Option<String>,
}

pub async fn create_recipe(
    Extension(state): Extension<AppState>,
    Json(command): Json<CreateRecipe>,
) -> Result<(StatusCode, Json<Created<RecipeId>>), ApiError> {
    let id = state.bus.handle(command).await?;
    Ok(created(id))
}

pub async fn rate_recipe(
    Extension(state): Extension<AppState>,
    Path(recipe_id): Path<RecipeId>,
    Json(request): Json<RateRecipeRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .bus
        .handle(RateRecipe {
            recipe_id,
            user_id: request.user_id,
            taste: request.taste,
            convenience: request.convenience,
            comment: request.comment,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_recipe(
    Extension(state): Extension<AppState>,
    Path(recipe_id): Path<RecipeId>,
) -> Result<StatusCode, ApiError> {
    state.bus.handle(DeleteRecipe { recipe_id }).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_recipe(
    Extension(state): Extension<AppState>,
    Path(id): Path<RecipeId>,
) -> Result<Json<Recipe>, ApiError> {
    queries::get_recipe(&state.uow_factory, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("recipe", id))
}

pub async fn list_recipes(
    Extension(state): Extension<AppState>,
    Query(filter): Query<RecipeFilter>,
) -> Result<Json<RecipePage>, ApiError> {
    let tag = filter.tag.as_deref();
    let items = queries::list_recipes(&state.uow_factory, tag, filter.limit, filter.offset).await?;
    let total = queries::count_recipes(&state.uow_factory, tag).await?;
    Ok(Json(RecipePage { items, total }))
}
