// Main entry point for the menu planner API server

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::kernel::{build_bus, MenuUnitOfWorkFactory, PgStore};
use server_core::server::{build_app, AppState};
use server_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,ladle=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Menu Planner API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let (factory, pool) = match &config.database_url {
        Some(database_url) => {
            // Connect to database
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connected");

            // Run migrations
            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Migrations complete");

            let store = PgStore::new(pool.clone());
            (MenuUnitOfWorkFactory::new(Arc::new(store)), Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            let (factory, _store) = MenuUnitOfWorkFactory::in_memory();
            (factory, None)
        }
    };

    // Build application
    let bus = build_bus(factory, config.bus_config()).context("Failed to build message bus")?;
    let app = build_app(AppState::new(bus, pool));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
