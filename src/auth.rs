//! # Authentication and Authorization
//!
//! This module provides the service-level API key guard and the bearer-token
//! extractor used by endpoints that act on behalf of a signed-in user.
//!
//! The guard runs as router middleware: a short allow-list of public paths is
//! exempt, everything else must present the configured API key. Comparison is
//! constant-time and an unconfigured key denies every guarded request.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized, unauthorized_with_trace_id};
use crate::models::SafeUser;
use crate::repositories::UserRepository;
use crate::server::AppState;
use crate::telemetry::TraceContext;
use crate::token::Claims;

/// Header names accepted for the API key. The underscore spelling is kept for
/// clients that predate the hyphenated form.
const API_KEY_HEADERS: [&str; 2] = ["x-api-key", "x-api_key"];

/// Paths reachable without an API key.
const PUBLIC_PATHS: [&str; 6] = [
    "/",
    "/health",
    "/health/db",
    "/openapi.json",
    "/auth/login",
    "/auth/client-signup",
];

/// Authenticated user extracted from a verified bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: SafeUser,
    pub claims: Claims,
}

fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || path == "/docs" || path.starts_with("/docs/")
}

/// Middleware guarding every non-public route behind the service API key
pub async fn api_key_middleware(
    State(config): State<Arc<AppConfig>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_public_path(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let trace_id = request
        .extensions()
        .get::<TraceContext>()
        .map(|ctx| ctx.trace_id.clone());

    let Some(configured) = config.api_key.as_deref().filter(|key| !key.is_empty()) else {
        // No key configured means no guarded request can ever pass.
        tracing::warn!("API key not configured; rejecting guarded request");
        return Err(invalid_api_key(trace_id));
    };

    let presented = extract_api_key(request.headers());

    let is_valid = presented.is_some_and(|candidate| {
        ConstantTimeEq::ct_eq(candidate.as_bytes(), configured.as_bytes()).into()
    });

    if !is_valid {
        return Err(invalid_api_key(trace_id));
    }

    Ok(next.run(request).await)
}

fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    API_KEY_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
}

fn invalid_api_key(trace_id: Option<String>) -> ApiError {
    match trace_id {
        Some(trace_id) => unauthorized_with_trace_id(Some("Invalid API key"), trace_id),
        None => unauthorized(Some("Invalid API key")),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))
        .and_then(|value| {
            value
                .to_str()
                .map_err(|_| unauthorized(Some("Invalid Authorization header")))
        })
        .and_then(|header| {
            header
                .strip_prefix("Bearer ")
                .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
        })
}

impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let token = extract_bearer_token(&parts.headers)?;
        let claims = state
            .tokens
            .verify(token)
            .map_err(|err| {
                tracing::debug!("Bearer token rejected: {}", err);
                unauthorized(Some("Invalid token"))
            })?;

        // The token may outlive the account it was issued for.
        let user = UserRepository::new(&state.db)
            .find_by_id(claims.sub)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| unauthorized(Some("Invalid token")))?;

        Ok(CurrentUser {
            user: SafeUser::from(user),
            claims,
        })
    }
}
