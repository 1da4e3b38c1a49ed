//! # annohub-core
//!
//! Core crate for AnnoHub. Contains the configuration schema, typed
//! identifiers, and the unified error system shared by the broker and the
//! HTTP gateway.
//!
//! This crate has **no** internal dependencies on other AnnoHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
