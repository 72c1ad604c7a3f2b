//! End-to-end tests for the HTTP surface: routing, middleware ordering,
//! error bodies, and the full signup/login/me flow against an in-memory
//! database.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use accounts_api::config::AppConfig;
use accounts_api::db::init_pool;
use accounts_api::migration::{Migrator, MigratorTrait};
use accounts_api::server::{AppState, create_app};
use accounts_api::token::TokenIssuer;

const API_KEY: &str = "integration-test-key";

async fn setup_app() -> (AppState, Router) {
    let config = AppConfig {
        profile: "test".to_string(),
        local_database_url: Some("sqlite::memory:".to_string()),
        // One pooled connection keeps every query on the same in-memory DB.
        db_max_connections: 1,
        api_key: Some(API_KEY.to_string()),
        jwt_secret: Some("integration-test-jwt-secret".to_string()),
        ..Default::default()
    };

    let db = init_pool(&config).await.expect("Failed to init test DB");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    let tokens = TokenIssuer::from_config(&config).expect("Failed to build token issuer");
    let state = AppState {
        config: Arc::new(config),
        db,
        tokens,
    };
    let app = create_app(state.clone());
    (state, app)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_with_key(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn sample_signup() -> Value {
    json!({
        "contactName": "Alice",
        "companyName": "Acme Corp",
        "email": "alice@example.com",
        "password": "supersecret",
        "projectName": "Launch"
    })
}

async fn signup(app: &Router) -> Value {
    let response = app
        .clone()
        .oneshot(post_json("/auth/client-signup", &sample_signup()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn root_and_health_are_public() {
    let (_state, app) = setup_app().await;

    for uri in ["/", "/health", "/health/db", "/openapi.json"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "path {uri}");
    }

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["message"], "OK");
}

#[tokio::test]
async fn signup_then_login_then_me() {
    let (_state, app) = setup_app().await;

    let signup_body = signup(&app).await;
    assert_eq!(signup_body["user"]["email"], "alice@example.com");
    assert_eq!(signup_body["user"]["role"], "USER");
    assert_eq!(signup_body["client"]["name"], "Acme Corp");
    assert_eq!(signup_body["project"]["name"], "Launch");
    assert_eq!(signup_body["project"]["status"], "active");
    assert_eq!(
        signup_body["user"]["clientId"],
        signup_body["client"]["id"]
    );
    assert!(signup_body["accessToken"].as_str().is_some_and(|t| !t.is_empty()));

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            &json!({ "email": "alice@example.com", "password": "supersecret" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let login_body = body_json(response).await;
    let token = login_body["accessToken"].as_str().unwrap().to_string();
    assert_eq!(login_body["user"]["id"], signup_body["user"]["id"]);

    // The hash never leaves the service.
    assert!(login_body["user"].get("hashedPassword").is_none());
    assert!(login_body["user"].get("hashed_password").is_none());

    let request = Request::builder()
        .uri("/auth/me")
        .header("x-api-key", API_KEY)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me_body = body_json(response).await;
    assert_eq!(me_body["email"], "alice@example.com");
}

#[tokio::test]
async fn login_failures_share_one_response_shape() {
    let (_state, app) = setup_app().await;
    signup(&app).await;

    let attempts = [
        json!({ "email": "nobody@example.com", "password": "supersecret" }),
        json!({ "email": "alice@example.com", "password": "wrong-password" }),
        // Signup stored the email lower-cased; lookup is exact.
        json!({ "email": "Alice@Example.com", "password": "supersecret" }),
    ];

    for attempt in attempts {
        let response = app
            .clone()
            .oneshot(post_json("/auth/login", &attempt))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
        let body = body_json(response).await;
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
        assert_eq!(body["message"], "Invalid credentials");
    }
}

#[tokio::test]
async fn duplicate_signup_conflicts_name_the_target() {
    let (_state, app) = setup_app().await;
    signup(&app).await;

    let mut duplicate_email = sample_signup();
    duplicate_email["companyName"] = json!("Other Co");
    let response = app
        .clone()
        .oneshot(post_json("/auth/client-signup", &duplicate_email))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["details"]["target"], "email");

    let mut duplicate_company = sample_signup();
    duplicate_company["email"] = json!("bob@example.com");
    let response = app
        .clone()
        .oneshot(post_json("/auth/client-signup", &duplicate_company))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["details"]["target"], "company");
}

#[tokio::test]
async fn signup_validation_failures_list_fields() {
    let (_state, app) = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/client-signup",
            &json!({
                "contactName": "",
                "companyName": "A",
                "email": "not-an-email",
                "password": "short",
                "projectName": "x"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
    for field in ["contactName", "companyName", "email", "password", "projectName"] {
        assert!(body["details"].get(field).is_some(), "missing {field}");
    }
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let (_state, app) = setup_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_endpoints_require_the_api_key() {
    let (_state, app) = setup_app().await;

    let request = Request::builder().uri("/users").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid API key");
    assert!(body["traceId"].as_str().is_some_and(|id| !id.is_empty()));

    let request = Request::builder()
        .uri("/users")
        .header("x-api-key", "wrong")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_crud_round_trip() {
    let (_state, app) = setup_app().await;
    let signup_body = signup(&app).await;
    let client_id = signup_body["client"]["id"].clone();

    let response = app
        .clone()
        .oneshot(post_json_with_key(
            "/users",
            &json!({
                "email": "Bob@Example.com",
                "name": "Bob",
                "password": "supersecret",
                "clientId": client_id
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    // Unspecified role defaults to USER; the email is stored lower-cased.
    assert_eq!(created["role"], "USER");
    assert_eq!(created["email"], "bob@example.com");
    let bob_id = created["id"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri("/users")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/users/{bob_id}"))
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Deleting again reports the absence.
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/users/{bob_id}"))
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_user_email_conflicts() {
    let (_state, app) = setup_app().await;
    signup(&app).await;

    let response = app
        .clone()
        .oneshot(post_json_with_key(
            "/users",
            &json!({
                "email": "alice@example.com",
                "password": "supersecret"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["details"]["target"], "email");
}

#[tokio::test]
async fn me_rejects_missing_and_invalid_tokens() {
    let (state, app) = setup_app().await;

    let request = Request::builder()
        .uri("/auth/me")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/auth/me")
        .header("x-api-key", API_KEY)
        .header("Authorization", "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A structurally valid token naming a deleted user is rejected too.
    let ghost = accounts_api::models::SafeUser {
        id: uuid::Uuid::new_v4(),
        email: "ghost@example.com".to_string(),
        name: None,
        role: accounts_api::models::Role::User,
        staff_role: None,
        client_id: None,
        is_email_verified: false,
        created_at: chrono::Utc::now().into(),
        updated_at: chrono::Utc::now().into(),
    };
    let token = state.tokens.issue(&ghost).unwrap();
    let request = Request::builder()
        .uri("/auth/me")
        .header("x-api-key", API_KEY)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_secret_is_enforced_when_configured() {
    let config = AppConfig {
        profile: "test".to_string(),
        local_database_url: Some("sqlite::memory:".to_string()),
        db_max_connections: 1,
        api_key: Some(API_KEY.to_string()),
        jwt_secret: Some("integration-test-jwt-secret".to_string()),
        signup_secret: Some("letmein".to_string()),
        ..Default::default()
    };
    let db = init_pool(&config).await.expect("Failed to init test DB");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    let tokens = TokenIssuer::from_config(&config).expect("Failed to build token issuer");
    let app = create_app(AppState {
        config: Arc::new(config),
        db,
        tokens,
    });

    let response = app
        .clone()
        .oneshot(post_json("/auth/client-signup", &sample_signup()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_SIGNUP_SECRET");

    let mut with_secret = sample_signup();
    with_secret["signUpSecret"] = json!("letmein");
    let response = app
        .clone()
        .oneshot(post_json("/auth/client-signup", &with_secret))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}
