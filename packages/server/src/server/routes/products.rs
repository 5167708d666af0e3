use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{created, Created};
use crate::common::ProductId;
use crate::domains::products::{queries, AddProduct, Product, ProductChanges, UpdateProduct};
use crate::server::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Changed {
    pub changed: bool,
}

pub async fn add_product(
    Extension(state): Extension<AppState>,
    Json(command): Json<AddProduct>,
) -> Result<(StatusCode, Json<Created<ProductId>>), ApiError> {
    let id = state.bus.handle(command).await?;
    Ok(created(id))
}

pub async fn update_product(
    Extension(state): Extension<AppState>,
    Path(product_id): Path<ProductId>,
    Json(changes): Json<ProductChanges>,
) -> Result<Json<Changed>, ApiError> {
    let changed = state
        .bus
        .handle(UpdateProduct {
            product_id,
            changes,
        })
        .await?;
    Ok(Json(Changed { changed }))
}

pub async fn get_product(
    Extension(state): Extension<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    queries::get_product(&state.uow_factory, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("product", id))
}

pub async fn list_products(
    Extension(state): Extension<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = queries::list_products(&state.uow_factory, filter.category.as_deref()).await?;
    Ok(Json(products))
}
