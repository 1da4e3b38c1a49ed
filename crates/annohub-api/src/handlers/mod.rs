//! HTTP request handlers.

pub mod annotation;
pub mod health;
pub mod session;
