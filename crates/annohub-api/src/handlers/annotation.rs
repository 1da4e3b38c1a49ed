//! Annotation handlers: send, send private, and long-poll fetch.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;

use annohub_core::error::AppError;
use annohub_realtime::Submission;

use crate::dto::request::PollQuery;
use crate::dto::response::{ApiResponse, PollResponse, SendResponse};
use crate::error::ApiError;
use crate::extractors::{MaybeSession, Session};
use crate::state::AppState;

/// Headers that keep proxies and browsers from caching poll results.
pub const NO_CACHE: [(header::HeaderName, &str); 2] = [
    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (header::PRAGMA, "no-cache"),
];

/// POST /api/send
pub async fn send(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<serde_json::Value>,
) -> Json<ApiResponse<SendResponse>> {
    state
        .broker
        .submit(Submission::broadcast(session.identity(), payload));
    Json(ApiResponse::ok(SendResponse { accepted: true }))
}

/// POST /api/send/{name}
pub async fn send_private(
    State(state): State<AppState>,
    session: Session,
    Path(name): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<SendResponse>>, ApiError> {
    let target = state
        .broker
        .find(&name)
        .ok_or_else(|| AppError::not_found(format!("No session named '{name}'")))?;

    state.broker.submit(Submission::private(
        session.identity(),
        target.id(),
        payload,
    ));
    Ok(Json(ApiResponse::ok(SendResponse { accepted: true })))
}

/// GET /api/get?timeout=
///
/// Unknown sessions get an immediate `done` so stale clients stop polling.
pub async fn poll(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Query(query): Query<PollQuery>,
) -> impl IntoResponse {
    let response = match session {
        Some(handle) => {
            let timeout = state.config.broker.clamp_poll_timeout(query.timeout);
            PollResponse::from(state.broker.next(&handle, timeout).await)
        }
        None => PollResponse::Done,
    };
    (NO_CACHE, Json(ApiResponse::ok(response)))
}
