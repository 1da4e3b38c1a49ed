//! Session extractors: resolve the `x-session-id` header to a live broker session.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use annohub_core::error::AppError;
use annohub_core::types::IdentityId;
use annohub_realtime::IdentityHandle;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the session id returned by login.
pub const SESSION_HEADER: &str = "x-session-id";

fn lookup(parts: &Parts, state: &AppState) -> Option<IdentityHandle> {
    let id: IdentityId = parts
        .headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())?;
    state.broker.session(id)
}

/// A registered session. Rejects with 401 when the header is missing or unknown.
#[derive(Debug, Clone)]
pub struct Session(pub IdentityHandle);

impl std::ops::Deref for Session {
    type Target = IdentityHandle;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        lookup(parts, state)
            .map(Session)
            .ok_or_else(|| AppError::unauthorized("Missing or unknown session").into())
    }
}

/// A session that may be absent; used by routes that answer unknown callers.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<IdentityHandle>);

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(lookup(parts, state)))
    }
}
