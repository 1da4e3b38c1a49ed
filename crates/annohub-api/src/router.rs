//! Route definitions for the AnnoHub HTTP API.
//!
//! All routes are mounted under `/api`.

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(session_routes())
        .merge(annotation_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Login and logout
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::session::login))
        .route("/close", delete(handlers::session::close))
}

/// Broadcast, private send, and long-poll fetch
fn annotation_routes() -> Router<AppState> {
    Router::new()
        .route("/send", post(handlers::annotation::send))
        .route("/send/{name}", post(handlers::annotation::send_private))
        .route("/get", get(handlers::annotation::poll))
}

/// Health and server clock
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/date", get(handlers::health::date))
}
