//! # Health Handlers
//!
//! Liveness and database reachability probes. Both are public: the process
//! probe never touches storage, the database probe runs one trivial query.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db;
use crate::error::ApiError;
use crate::server::AppState;

/// Health probe response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Mirrors the HTTP status for clients that only read the body
    #[schema(example = 200)]
    pub status_code: u16,
    #[schema(example = "OK")]
    pub message: String,
}

impl HealthResponse {
    fn ok() -> Self {
        Self {
            status_code: 200,
            message: "OK".to_string(),
        }
    }
}

/// Process liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Database reachability probe
#[utoipa::path(
    get,
    path = "/health/db",
    responses(
        (status = 200, description = "Database is reachable", body = HealthResponse),
        (status = 503, description = "Database is unreachable", body = ApiError)
    ),
    tag = "health"
)]
pub async fn health_db(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    db::health_check(&state.db).await.map_err(|err| {
        tracing::error!("Database health check failed: {:?}", err);
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Database is unreachable",
        )
    })?;

    Ok(Json(HealthResponse::ok()))
}
