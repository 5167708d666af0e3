//! Application setup and server configuration.

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::{AppBus, MenuUnitOfWorkFactory};
use crate::server::routes::{clients, health_handler, meals, menus, products, recipes};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Writes: one command per request.
    pub bus: AppBus,
    /// Reads: queries open their own short unit of work.
    pub uow_factory: MenuUnitOfWorkFactory,
    /// Set when running on Postgres; used by the health check.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(bus: AppBus, db_pool: Option<PgPool>) -> Self {
        Self {
            uow_factory: bus.unit_of_work_factory().clone(),
            bus,
            db_pool,
        }
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    // CORS configuration - allow any origin for development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/products",
            post(products::add_product).get(products::list_products),
        )
        .route(
            "/products/:id",
            get(products::get_product).patch(products::update_product),
        )
        .route(
            "/recipes",
            post(recipes::create_recipe).get(recipes::list_recipes),
        )
        .route(
            "/recipes/:id",
            get(recipes::get_recipe).delete(recipes::delete_recipe),
        )
        .route("/recipes/:id/ratings", post(recipes::rate_recipe))
        .route("/meals", post(meals::create_meal))
        .route("/meals/:id", get(meals::get_meal).patch(meals::update_meal))
        .route("/clients", post(clients::create_client))
        .route("/clients/:id", get(clients::get_client))
        .route("/clients/:id/menus", get(clients::list_client_menus))
        .route("/menus", post(menus::create_menu))
        .route("/menus/:id", get(menus::get_menu))
        .route("/menus/:id/meals", post(menus::add_meal_to_menu))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
