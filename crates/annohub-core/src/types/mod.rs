//! Core type definitions used across the AnnoHub workspace.

pub mod id;

pub use id::IdentityId;
