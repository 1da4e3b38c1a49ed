//! # annohub-realtime
//!
//! Broadcast broker for live annotation sessions. Provides:
//!
//! - A single dispatcher task that assigns every message its place in a
//!   total delivery order
//! - Per-subscriber mailboxes with bounded, wake-on-close long-poll fetches
//! - Unique name/address registration with gap-free history replay
//! - A best-effort durable log of every broadcast annotation
//! - Idle-subscriber expiry and delivery metrics

pub mod broker;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod message;
pub mod metrics;
pub mod persistence;
pub mod subscriber;

pub use broker::{Broker, BrokerState};
pub use error::RegisterError;
pub use message::{Delivery, Message, MessageKind, Submission};
pub use subscriber::{Identity, IdentityHandle, Mailbox};
