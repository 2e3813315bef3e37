//! Common test utilities and helpers for integration tests

#![allow(dead_code)]
#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;

use authgate_api::{
    config::Config,
    routes::create_router,
    state::AppState,
    store::{MemoryStore, Store},
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-32-bytes-long";

/// Test configuration: cheap hashing parameters plus any overrides
pub fn create_test_config_with(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<&str, &str> = HashMap::from([
        ("JWT_SECRET", TEST_SECRET),
        ("HASH_MEMORY_KIB", "1024"),
        ("HASH_ITERATIONS", "1"),
        ("HASH_PARALLELISM", "1"),
    ]);
    vars.extend(overrides.iter().copied());
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
        .expect("Failed to build test config")
}

pub fn create_test_config() -> Config {
    create_test_config_with(&[])
}

/// Create the application state over the given store
pub fn create_test_state(config: Config, store: Arc<dyn Store>) -> AppState {
    AppState::new(config, store).expect("Failed to build app state")
}

/// Create the full application router over a fresh in-memory store
pub fn create_test_app() -> Router {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    create_router(create_test_state(create_test_config(), store))
}

/// Post an operation to `/query`, returning the status and JSON body
pub async fn post_operation(
    app: &Router,
    operation: &str,
    variables: Value,
    token: Option<&str>,
) -> (StatusCode, Value) {
    post_to(app, "/query", operation, variables, token).await
}

pub async fn post_to(
    app: &Router,
    path: &str,
    operation: &str,
    variables: Value,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let body = json!({ "operationName": operation, "variables": variables });
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = builder
        .body(Body::from(body.to_string()))
        .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Router returned an error");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Register an account and return its token and id
pub async fn register(app: &Router, name: &str, email: &str, password: &str) -> (String, String) {
    let (status, body) = post_operation(
        app,
        "Register",
        json!({ "name": name, "email": email, "password": password }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", body);

    let token = body["data"]["register"]["token"]
        .as_str()
        .expect("register returned no token")
        .to_string();
    let id = body["data"]["register"]["user"]["_id"]
        .as_str()
        .expect("register returned no user id")
        .to_string();
    (token, id)
}
