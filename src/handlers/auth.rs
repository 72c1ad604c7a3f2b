//! # Auth Handlers
//!
//! Login, client signup, and the bearer-token identity endpoint. Wire JSON is
//! camelCase; field validation happens here, before the service layer sees
//! the request.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::accounts::{AccountService, SignupData};
use crate::auth::CurrentUser;
use crate::error::{ApiError, validation_error};
use crate::handlers::is_valid_email;
use crate::models::{SafeClient, SafeProject, SafeUser};
use crate::server::AppState;

/// Request payload for credential login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "supersecret")]
    pub password: String,
}

/// Response payload for a successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Signed bearer token
    pub access_token: String,
    pub user: SafeUser,
}

/// Request payload for client signup
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[schema(example = "Alice")]
    pub contact_name: String,
    #[schema(example = "Acme Corp")]
    pub company_name: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub password: String,
    #[schema(example = "Launch")]
    pub project_name: String,
    /// Required when the deployment configures a signup secret
    pub sign_up_secret: Option<String>,
}

/// Response payload for a successful signup
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub access_token: String,
    pub user: SafeUser,
    pub client: SafeClient,
    pub project: SafeProject,
}

impl LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Map::new();

        if self.email.is_empty() || self.email.len() > 254 || !self.email.contains('@') {
            errors.insert("email".to_string(), Value::from("Must be a valid email"));
        }
        if self.password.len() < 8 || self.password.len() > 128 {
            errors.insert(
                "password".to_string(),
                Value::from("Must be between 8 and 128 characters"),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(validation_error("Validation failed", Value::Object(errors)))
        }
    }
}

impl SignupRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Map::new();

        let contact_name = self.contact_name.trim();
        if contact_name.is_empty() || contact_name.len() > 80 {
            errors.insert(
                "contactName".to_string(),
                Value::from("Must be between 1 and 80 characters"),
            );
        }

        let company_name = self.company_name.trim();
        if company_name.len() < 2 || company_name.len() > 120 {
            errors.insert(
                "companyName".to_string(),
                Value::from("Must be between 2 and 120 characters"),
            );
        }

        let email = self.email.trim();
        if email.len() > 254 || !is_valid_email(email) {
            errors.insert("email".to_string(), Value::from("Must be a valid email"));
        }

        // Bcrypt only hashes the first 72 bytes, so longer passwords are
        // rejected rather than silently truncated.
        if self.password.len() < 8 || self.password.len() > 72 {
            errors.insert(
                "password".to_string(),
                Value::from("Must be between 8 and 72 characters"),
            );
        }

        let project_name = self.project_name.trim();
        if project_name.len() < 2 || project_name.len() > 120 {
            errors.insert(
                "projectName".to_string(),
                Value::from("Must be between 2 and 120 characters"),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(validation_error("Validation failed", Value::Object(errors)))
        }
    }
}

/// Authenticate with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Invalid credentials", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    request.validate()?;

    let service = AccountService::new(&state.db, &state.tokens, state.config.signup_secret.as_deref());
    let session = service.login(&request.email, &request.password).await?;

    Ok(Json(LoginResponse {
        access_token: session.access_token,
        user: session.user,
    }))
}

/// Provision a new client account with its first user and project
#[utoipa::path(
    post,
    path = "/auth/client-signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account provisioned", body = SignupResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Invalid signup secret", body = ApiError),
        (status = 409, description = "Email or company name already in use", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn client_signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    request.validate()?;

    let service = AccountService::new(&state.db, &state.tokens, state.config.signup_secret.as_deref());
    let outcome = service
        .client_signup(SignupData {
            contact_name: request.contact_name,
            company_name: request.company_name,
            email: request.email,
            password: request.password,
            project_name: request.project_name,
            signup_secret: request.sign_up_secret,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            access_token: outcome.access_token,
            user: outcome.user,
            client: outcome.client,
            project: outcome.project,
        }),
    ))
}

/// Return the user named by the presented bearer token
#[utoipa::path(
    get,
    path = "/auth/me",
    security(("api_key" = []), ("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = SafeUser),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn me(current: CurrentUser) -> Json<SafeUser> {
    Json(current.user)
}
