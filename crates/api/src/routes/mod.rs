//! HTTP routes

pub mod operations;
pub mod playground;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::require_auth;
use crate::state::AppState;

/// Paths that accept posted operations
pub const OPERATION_PATHS: [&str; 2] = ["/query", "/graphql"];

/// Build the application router
///
/// Layer order, outermost first: trace, CORS, timeout, authentication gate.
/// CORS sits outside the gate so preflight requests are answered without a
/// token.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);
    let timeout = TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        state.config.request_timeout,
    );

    Router::new()
        .route(OPERATION_PATHS[0], post(operations::handle_operation))
        .route(OPERATION_PATHS[1], post(operations::handle_operation))
        .route(
            &state.config.playground_path,
            get(playground::playground_page),
        )
        .layer(middleware::from_fn_with_state(
            state.auth_state(),
            require_auth,
        ))
        .layer(timeout)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    tracing::info!(
        allowed_origins = ?allowed_origins,
        "CORS configured with {} allowed origins",
        allowed_origins.len()
    );

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
