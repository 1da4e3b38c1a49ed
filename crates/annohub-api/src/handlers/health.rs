//! Health check and server clock handlers.

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;

use crate::dto::response::{ApiResponse, DateResponse, HealthResponse};
use crate::handlers::annotation::NO_CACHE;
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let broker_state = state.broker.state();
    Json(ApiResponse::ok(HealthResponse {
        status: if broker_state.is_accepting() { "ok" } else { "stopping" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        broker: broker_state,
        subscribers: state.broker.subscriber_count(),
        history: state.broker.history_len(),
        metrics: state.broker.metrics(),
    }))
}

/// GET /api/date
pub async fn date() -> impl IntoResponse {
    (
        NO_CACHE,
        Json(ApiResponse::ok(DateResponse {
            epoch_ms: Utc::now().timestamp_millis(),
        })),
    )
}
