// HTTP routes
//
// Writes build one command and hand it to the bus; reads call the domain
// queries directly.
pub mod clients;
pub mod health;
pub mod meals;
pub mod menus;
pub mod products;
pub mod recipes;

pub use health::*;

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Body of a `201 Created` response.
#[derive(Debug, Serialize)]
pub struct Created<T> {
    pub id: T,
}

pub fn created<T: Serialize>(id: T) -> (StatusCode, Json<Created<T>>) {
    (StatusCode::CREATED, Json(Created { id }))
}
