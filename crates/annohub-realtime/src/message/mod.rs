//! Broker message types, submission builders, and log serialization.

pub mod builder;
pub mod serializer;
pub mod types;

pub use builder::Submission;
pub use types::{Delivery, LeaveReason, Message, MessageKind};
