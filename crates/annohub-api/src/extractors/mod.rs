//! Custom Axum extractors.

pub mod session;

pub use session::{MaybeSession, Session, SESSION_HEADER};
