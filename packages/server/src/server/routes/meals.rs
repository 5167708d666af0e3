use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::products::Changed;
use super::{created, Created};
use crate::common::MealId;
use crate::domains::meals::{queries, CreateMeal, Meal, UpdateMeal};
use crate::server::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct UpdateMealRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn create_meal(
    Extension(state): Extension<AppState>,
    Json(command): Json<CreateMeal>,
) -> Result<(StatusCode, Json<Created<MealId>>), ApiError> {
    let id = state.bus.handle(command).await?;
    Ok(created(id))
}

pub async fn update_meal(
    Extension(state): Extension<AppState>,
    Path(meal_id): Path<MealId>,
    Json(request): Json<UpdateMealRequest>,
) -> Result<Json<Changed>, ApiError> {
    let changed = state
        .bus
        .handle(UpdateMeal {
            meal_id,
            name: request.name,
            description: request.description,
        })
        .await?;
    Ok(Json(Changed { changed }))
}

pub async fn get_meal(
    Extension(state): Extension<AppState>,
    Path(id): Path<MealId>,
) -> Result<Json<Meal>, ApiError> {
    queries::get_meal(&state.uow_factory, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("meal", id))
}
