//! Route definitions for the API server

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Creates the main application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Game endpoints
        .route("/game/next", get(handlers::next_scenario))
        .route("/game/reveal/:scenario_id", post(handlers::reveal))
        // Admin endpoints
        .route("/admin/seed", post(handlers::seed))
        .route("/admin/status", get(handlers::status))
        // Add middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Add shared state
        .with_state(state)
}
