//! Shared helpers for router tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use habit_tracker_api::{build_router, config::Config, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://postgres@localhost/habit_tracker_test".into(),
        database_max_connections: 5,
        host: "127.0.0.1".into(),
        port: 0,
        frontend_url: "http://localhost:3000".into(),
        cors_extra_origins: vec![],
        auth_rate_limit_max: 1000,
        auth_rate_limit_window_secs: 60,
    }
}

/// Router over a pool that never connects. Only paths that reject before
/// touching the database may be exercised with it.
pub fn offline_app(config: Config) -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("valid database url");
    build_router(AppState::new(pool, config))
}

pub fn app_with_pool(pool: PgPool) -> Router {
    build_router(AppState::new(pool, test_config()))
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Register `username` and return its token.
pub async fn register(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/register/",
        None,
        Some(serde_json::json!({ "username": username, "password": "testpass123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

pub async fn create_habit(app: &Router, token: &str, name: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/habits/",
        Some(token),
        Some(serde_json::json!({
            "name": name,
            "description": "Read 30 pages",
            "frequency": "daily",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create habit failed: {body}");
    body
}
