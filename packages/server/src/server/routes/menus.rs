use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{created, Created};
use crate::common::{MealId, MenuId};
use crate::domains::menus::{queries, AddMealToMenu, CreateMenu, MealType, Menu, Weekday};
use crate::server::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct AddMealRequest {
    pub meal_id: MealId,
    pub week: u32,
    pub weekday: Weekday,
    pub meal_type: MealType,
}

pub async fn create_menu(
    Extension(state): Extension<AppState>,
    Json(command): Json<CreateMenu>,
) -> Result<(StatusCode, Json<Created<MenuId>>), ApiError> {
    let id = state.bus.handle(command).await?;
    Ok(created(id))
}

pub async fn add_meal_to_menu(
    Extension(state): Extension<AppState>,
    Path(menu_id): Path<MenuId>,
    Json(request): Json<AddMealRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .bus
        .handle(AddMealToMenu {
            menu_id,
            meal_id: request.meal_id,
            week: request.week,
            weekday: request.weekday,
            meal_type: request.meal_type,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_menu(
    Extension(state): Extension<AppState>,
    Path(id): Path<MenuId>,
) -> Result<Json<Menu>, ApiError> {
    queries::get_menu(&state.uow_factory, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("menu", id))
}
