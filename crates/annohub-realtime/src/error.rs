//! Caller-visible broker errors.

use annohub_core::error::AppError;
use thiserror::Error;

/// Why a registration was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// The name or the address is already held by a registered identity.
    #[error("name '{name}' or address '{address}' is already in use")]
    NameInUse {
        /// Requested name.
        name: String,
        /// Requested address.
        address: String,
    },
    /// The broker no longer accepts registrations.
    #[error("broker is shutting down")]
    ShuttingDown,
}

impl From<RegisterError> for AppError {
    fn from(err: RegisterError) -> Self {
        match err {
            RegisterError::NameInUse { .. } => AppError::conflict(err.to_string()),
            RegisterError::ShuttingDown => AppError::service_unavailable(err.to_string()),
        }
    }
}
