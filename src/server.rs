//! # Server Configuration
//!
//! This module contains the server setup and configuration for the Accounts API.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::api_key_middleware;
use crate::config::AppConfig;
use crate::db::init_pool;
use crate::handlers;
use crate::telemetry::trace_context_middleware;
use crate::token::TokenIssuer;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub tokens: TokenIssuer,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health::health))
        .route("/health/db", get(handlers::health::health_db))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/client-signup", post(handlers::auth::client_signup))
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/users",
            post(handlers::users::create_user).get(handlers::users::list_users),
        )
        .route("/users/{id}", delete(handlers::users::delete_user))
        .layer(axum::middleware::from_fn_with_state(
            config,
            api_key_middleware,
        ))
        .layer(axum::middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;

    let db = init_pool(&config).await?;
    migration::Migrator::up(&db, None).await?;

    let tokens = TokenIssuer::from_config(&config)?;

    let state = AppState {
        config: Arc::new(config),
        db,
        tokens,
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health::health,
        crate::handlers::health::health_db,
        crate::handlers::auth::login,
        crate::handlers::auth::client_signup,
        crate::handlers::auth::me,
        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
        crate::handlers::users::delete_user,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::SafeUser,
            crate::models::SafeClient,
            crate::models::SafeProject,
            crate::models::Role,
            crate::error::ApiError,
            crate::handlers::health::HealthResponse,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::SignupRequest,
            crate::handlers::auth::SignupResponse,
            crate::handlers::users::CreateUserRequest,
        )
    ),
    modifiers(&SecuritySchemes),
    info(
        title = "Accounts API",
        description = "Authentication and account provisioning API",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-api-key"))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
