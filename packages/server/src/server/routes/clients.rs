use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};

use super::{created, Created};
use crate::common::ClientId;
use crate::domains::clients::{queries, Client, CreateClient};
use crate::domains::menus::{self, Menu};
use crate::server::{ApiError, AppState};

pub async fn create_client(
    Extension(state): Extension<AppState>,
    Json(command): Json<CreateClient>,
) -> Result<(StatusCode, Json<Created<ClientId>>), ApiError> {
    let id = state.bus.handle(command).await?;
    Ok(created(id))
}

pub async fn get_client(
    Extension(state): Extension<AppState>,
    Path(id): Path<ClientId>,
) -> Result<Json<Client>, ApiError> {
    queries::get_client(&state.uow_factory, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("client", id))
}

pub async fn list_client_menus(
    Extension(state): Extension<AppState>,
    Path(id): Path<ClientId>,
) -> Result<Json<Vec<Menu>>, ApiError> {
    if queries::get_client(&state.uow_factory, id).await?.is_none() {
        return Err(ApiError::not_found("client", id));
    }
    let menus = menus::queries::list_client_menus(&state.uow_factory, id).await?;
    Ok(Json(menus))
}
