//! Response DTOs.

use serde::Serialize;

use annohub_realtime::metrics::MetricsSnapshot;
use annohub_realtime::{BrokerState, Delivery, Message};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Login response.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Session id to send back in the `x-session-id` header.
    pub session_id: String,
    /// Registered name.
    pub name: String,
    /// Registered address.
    pub address: String,
}

/// Acknowledgement for a submitted annotation.
#[derive(Debug, Clone, Serialize)]
pub struct SendResponse {
    /// The annotation was queued for dispatch.
    pub accepted: bool,
}

/// Simple message response.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

/// Result of one long-poll fetch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollResponse {
    /// The next message in the caller's stream.
    Message {
        /// The delivered message.
        message: Message,
    },
    /// Nothing arrived before the wait elapsed; poll again.
    NoMessage,
    /// The session is over; stop polling.
    Done,
}

impl From<Delivery> for PollResponse {
    fn from(delivery: Delivery) -> Self {
        match delivery {
            Delivery::Message(message) => PollResponse::Message {
                message: (*message).clone(),
            },
            Delivery::NoMessage => PollResponse::NoMessage,
            Delivery::Done => PollResponse::Done,
        }
    }
}

/// Server clock.
#[derive(Debug, Clone, Serialize)]
pub struct DateResponse {
    /// Milliseconds since the Unix epoch.
    pub epoch_ms: i64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Broker lifecycle state.
    pub broker: BrokerState,
    /// Live sessions.
    pub subscribers: usize,
    /// Messages retained for replay.
    pub history: usize,
    /// Broker counters.
    pub metrics: MetricsSnapshot,
}
