use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    store: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<DatabaseHealth>,
    event_bus: EventBusHealth,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    pool_size: u32,
    idle_connections: usize,
}

#[derive(Serialize)]
pub struct EventBusHealth {
    registered_commands: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_permits: Option<usize>,
}

/// Health check endpoint
///
/// Checks database connectivity when running on Postgres. Returns 200 OK if
/// all systems are healthy, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = match &state.db_pool {
        Some(pool) => {
            let (status, error) = match tokio::time::timeout(
                std::time::Duration::from_secs(5),
                sqlx::query("SELECT 1").execute(pool),
            )
            .await
            {
                Ok(Ok(_)) => ("ok", None),
                Ok(Err(e)) => ("error", Some(format!("Query failed: {}", e))),
                Err(_) => ("error", Some("Query timeout (>5s)".to_string())),
            };
            Some(DatabaseHealth {
                status: status.to_string(),
                error,
                pool_size: pool.size(),
                idle_connections: pool.num_idle(),
            })
        }
        None => None,
    };

    let event_bus = EventBusHealth {
        registered_commands: state.bus.registry().command_count(),
        available_permits: state.bus.limiter().available_permits(),
    };

    let is_healthy = database.as_ref().map_or(true, |db| db.status == "ok");
    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            store: if state.db_pool.is_some() { "postgres" } else { "memory" }.to_string(),
            database,
            event_bus,
        }),
    )
}
