//! # annohub-api
//!
//! HTTP long-poll gateway for AnnoHub built on Axum.
//!
//! Wraps the broker's register, submit, fetch-next, and unregister
//! primitives as REST endpoints, with request logging, extractors, DTOs,
//! and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
