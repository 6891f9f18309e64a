#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use std::sync::Arc;
use tokenward::{
    ServerConfig, create_app,
    db::Database,
    jwt::{Clock, JwtConfig, ManualClock},
    password::MIN_BCRYPT_COST,
};
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"test-jwt-secret-with-at-least-32-bytes";

/// Config backed by an in-memory database, with the cheapest bcrypt cost.
pub async fn test_config() -> ServerConfig {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let cache = Arc::new(db.revocations());
    ServerConfig {
        bcrypt_cost: MIN_BCRYPT_COST,
        ..ServerConfig::new(db, cache, TEST_SECRET.to_vec())
    }
}

pub async fn create_test_app() -> Router {
    create_app(&test_config().await)
}

/// App and token config sharing one manual clock.
///
/// Tokens issued within the same second are identical, so tests that replay
/// an old refresh token advance the clock between issuances.
pub async fn create_clocked_app() -> (Router, JwtConfig, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let config = ServerConfig {
        clock: clock.clone(),
        ..test_config().await
    };
    let jwt = JwtConfig::new(config.issuer.clone(), &config.jwt_secret)
        .with_ttls(config.access_ttl, config.refresh_ttl)
        .with_clock(clock.clone() as Arc<dyn Clock>);
    (create_app(&config), jwt, clock)
}

/// Send a request and decode the JSON response body (`Null` if empty).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Session returned by register, login and refresh.
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl Session {
    pub fn from_json(json: &serde_json::Value) -> Self {
        Self {
            user_id: json["user_id"].as_str().unwrap().to_string(),
            access_token: json["access_token"].as_str().unwrap().to_string(),
            refresh_token: json["refresh_token"].as_str().unwrap().to_string(),
        }
    }
}

pub async fn register(app: &Router, email: &str, password: &str) -> Session {
    let (status, json) = send(
        app,
        "POST",
        "/v1/register",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", json);
    Session::from_json(&json)
}

pub async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
    send(
        app,
        "POST",
        "/v1/login",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    )
    .await
}

pub async fn refresh(app: &Router, refresh_token: &str) -> (StatusCode, serde_json::Value) {
    send(
        app,
        "POST",
        "/v1/refresh",
        None,
        Some(serde_json::json!({ "refresh_token": refresh_token })),
    )
    .await
}
