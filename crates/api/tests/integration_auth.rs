//! Authentication flow integration tests
//!
//! Drives the full router (gate, dispatcher, account service, in-memory
//! store) the way a client would:
//! - Register and login
//! - Token-gated operations
//! - Failure responses and their messages

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::*;
use serde_json::json;
use tower::ServiceExt;

/// Register, log in, then use the token on a gated operation
#[tokio::test]
async fn test_register_login_and_list_users() {
    let app = create_test_app();
    let (_, user_id) = register(&app, "Ann", "ann@x.com", "pw123").await;

    let (status, body) = post_operation(
        &app,
        "Login",
        json!({ "email": "ann@x.com", "password": "pw123" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let login = &body["data"]["login"];
    assert_eq!(login["user"]["_id"], user_id.as_str());
    assert_eq!(login["user"]["email"], "ann@x.com");
    let token = login["token"].as_str().unwrap().to_string();

    let (status, body) = post_operation(&app, "GetUsers", json!({}), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["name"], "Ann");
    assert!(users[0].get("password").is_none());
    assert!(users[0].get("password_hash").is_none());
}

/// Lowercase bypass names are public too
#[tokio::test]
async fn test_lowercase_register_and_login() {
    let app = create_test_app();

    let (status, _) = post_operation(
        &app,
        "register",
        json!({ "email": "bo@x.com", "password": "pw" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_operation(
        &app,
        "login",
        json!({ "email": "bo@x.com", "password": "pw" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["login"]["user"]["name"], "");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = create_test_app();
    register(&app, "Ann", "ann@x.com", "pw123").await;

    let (status, body) = post_operation(
        &app,
        "Register",
        json!({ "name": "Other", "email": "ann@x.com", "password": "x" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already exists");

    // The first password still works
    let (status, _) = post_operation(
        &app,
        "Login",
        json!({ "email": "ann@x.com", "password": "pw123" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let app = create_test_app();
    register(&app, "Ann", "ann@x.com", "pw123").await;

    let (wrong_status, wrong_body) = post_operation(
        &app,
        "Login",
        json!({ "email": "ann@x.com", "password": "nope" }),
        None,
    )
    .await;
    let (unknown_status, unknown_body) = post_operation(
        &app,
        "Login",
        json!({ "email": "who@x.com", "password": "pw123" }),
        None,
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_register_requires_credentials() {
    let app = create_test_app();

    let (status, _) = post_operation(&app, "Register", json!({ "name": "Ann" }), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_operation(
        &app,
        "Register",
        json!({ "email": "", "password": "pw" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gated_operation_without_token() {
    let app = create_test_app();

    let (status, body) = post_operation(&app, "GetUsers", json!({}), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization header missing");

    let (status, body) = post_operation(&app, "GetUsers", json!({}), Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_me_returns_token_subject() {
    let app = create_test_app();
    let (token, user_id) = register(&app, "Ann", "ann@x.com", "pw123").await;
    register(&app, "Bo", "bo@x.com", "pw456").await;

    let (status, body) = post_operation(&app, "Me", json!({}), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["me"]["_id"], user_id.as_str());
    assert_eq!(body["data"]["me"]["name"], "Ann");
}

#[tokio::test]
async fn test_token_for_deleted_user_still_verifies() {
    let app = create_test_app();
    let (token, user_id) = register(&app, "Ann", "ann@x.com", "pw123").await;

    let (status, body) =
        post_operation(&app, "DeleteUser", json!({ "id": user_id }), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleteUser"]["deletedUserId"], user_id.as_str());

    // No revocation: the gate accepts the token, the lookup then misses
    let (status, _) = post_operation(&app, "Me", json!({}), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_graphql_path_is_an_alias() {
    let app = create_test_app();
    let (token, _) = register(&app, "Ann", "ann@x.com", "pw123").await;

    let (status, body) = post_to(&app, "/graphql", "getusers", json!({}), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_operation_is_bad_request() {
    let app = create_test_app();
    let (token, _) = register(&app, "Ann", "ann@x.com", "pw123").await;

    let (status, body) = post_operation(&app, "DropTables", json!({}), Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_playground_served_without_token() {
    let app = create_test_app();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("<html"));
    assert!(html.contains("/query"));
}

#[tokio::test]
async fn test_cors_preflight_needs_no_token() {
    let app = create_test_app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/query")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
}
