//! Convenience result type alias for AnnoHub.

use crate::error::AppError;

/// A specialized `Result` type for AnnoHub operations.
pub type AppResult<T> = Result<T, AppError>;
