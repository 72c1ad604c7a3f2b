//! # User Handlers
//!
//! Guarded user management: create, list, delete. These sit behind the API
//! key middleware; there is no per-user authorization beyond that.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::accounts::{AccountService, NewClientUser};
use crate::error::{ApiError, validation_error};
use crate::handlers::is_valid_email;
use crate::models::{Role, SafeUser};
use crate::repositories::UserRepository;
use crate::server::AppState;

/// Request payload for creating a user
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[schema(example = "bob@example.com")]
    pub email: String,
    #[schema(example = "Bob")]
    pub name: Option<String>,
    pub password: String,
    /// Defaults to USER when omitted
    pub role: Option<Role>,
    /// Existing client to attach the user to
    pub client_id: Option<Uuid>,
}

impl CreateUserRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Map::new();

        let email = self.email.trim();
        if email.len() > 254 || !is_valid_email(email) {
            errors.insert("email".to_string(), Value::from("Must be a valid email"));
        }
        if self.password.len() < 8 || self.password.len() > 72 {
            errors.insert(
                "password".to_string(),
                Value::from("Must be between 8 and 72 characters"),
            );
        }
        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() || name.len() > 80 {
                errors.insert(
                    "name".to_string(),
                    Value::from("Must be between 1 and 80 characters"),
                );
            }
        }
        // Admin accounts are never provisioned over the HTTP API.
        if self.role == Some(Role::Admin) {
            errors.insert(
                "role".to_string(),
                Value::from("Admin users cannot be created via this API"),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(validation_error("Validation failed", Value::Object(errors)))
        }
    }
}

/// Create a user
#[utoipa::path(
    post,
    path = "/users",
    security(("api_key" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = SafeUser),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 409, description = "Email already in use", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<SafeUser>), ApiError> {
    request.validate()?;

    let service = AccountService::new(&state.db, &state.tokens, state.config.signup_secret.as_deref());
    let user = service
        .create_client_user(NewClientUser {
            email: request.email,
            name: request.name.map(|name| name.trim().to_string()),
            password: request.password,
            role: request.role,
            client_id: request.client_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "All users, newest first", body = Vec<SafeUser>),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "users"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<SafeUser>>, ApiError> {
    let users = UserRepository::new(&state.db).list().await?;

    Ok(Json(users.into_iter().map(SafeUser::from).collect()))
}

/// Delete a user by id
#[utoipa::path(
    delete,
    path = "/users/{id}",
    security(("api_key" = [])),
    params(
        ("id" = Uuid, Path, description = "User id")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 404, description = "No such user", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = UserRepository::new(&state.db).delete(id).await?;

    if !deleted {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "User not found",
        )
        .with_details(serde_json::json!({ "id": id.to_string() })));
    }

    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_validation() {
        let ok = CreateUserRequest {
            email: "bob@example.com".to_string(),
            name: Some("Bob".to_string()),
            password: "supersecret".to_string(),
            role: None,
            client_id: None,
        };
        assert!(ok.validate().is_ok());

        let bad = CreateUserRequest {
            email: "nope".to_string(),
            name: Some("  ".to_string()),
            password: "short".to_string(),
            role: None,
            client_id: None,
        };
        let err = bad.validate().unwrap_err();
        let details = *err.details.expect("validation details");
        for field in ["email", "name", "password"] {
            assert!(details.get(field).is_some(), "missing error for {field}");
        }
    }

    #[test]
    fn create_user_rejects_admin_role() {
        let request = CreateUserRequest {
            email: "bob@example.com".to_string(),
            name: None,
            password: "supersecret".to_string(),
            role: Some(Role::Admin),
            client_id: None,
        };

        let err = request.validate().unwrap_err();
        let details = *err.details.expect("validation details");
        assert!(details.get("role").is_some());
    }
}
