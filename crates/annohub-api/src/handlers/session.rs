//! Session handlers: login and close.

use axum::Json;
use axum::extract::State;
use tracing::info;

use annohub_core::error::AppError;

use crate::dto::request::LoginRequest;
use crate::dto::response::{ApiResponse, LoginResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::MaybeSession;
use crate::state::AppState;

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let name = req.name.trim();
    let address = req.address.trim();
    if name.is_empty() || address.is_empty() {
        return Err(AppError::validation("Both name and address are required").into());
    }

    let handle = state.broker.register(name, address).await?;
    info!(identity_id = %handle.id(), name = %name, "Session opened");

    Ok(Json(ApiResponse::ok(LoginResponse {
        session_id: handle.id().to_string(),
        name: handle.identity().name.clone(),
        address: handle.identity().address.clone(),
    })))
}

/// DELETE /api/close
///
/// Succeeds for unknown sessions too.
pub async fn close(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Json<ApiResponse<MessageResponse>> {
    if let Some(handle) = session {
        state.broker.unregister(&handle);
        info!(identity_id = %handle.id(), "Session closed");
    }
    Json(ApiResponse::ok(MessageResponse {
        message: "Session closed".to_string(),
    }))
}
