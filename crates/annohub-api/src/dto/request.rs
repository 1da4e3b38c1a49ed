//! Request DTOs.

use serde::{Deserialize, Serialize};

/// Login request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Display name, unique among live sessions.
    pub name: String,
    /// Contact address, unique among live sessions.
    pub address: String,
}

/// Long-poll query parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollQuery {
    /// Seconds to wait for a message; clamped to the configured maximum.
    pub timeout: Option<u64>,
}
