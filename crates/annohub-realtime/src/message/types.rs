//! Sequenced message and fetch-result type definitions.

use std::sync::Arc;

use annohub_core::types::IdentityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subscriber::Identity;

use super::builder::Submission;

/// Kind tag carried by every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Delivered to every mailbox and recorded in history.
    Broadcast,
    /// Delivered only to the target mailbox; never recorded.
    Private,
    /// Announces a newly registered identity.
    SystemJoin,
    /// Announces an identity that left or was expired.
    SystemLeave,
    /// Terminal marker flushed into every mailbox at shutdown.
    Done,
}

impl MessageKind {
    /// Whether messages of this kind enter the history log.
    pub fn is_recorded(self) -> bool {
        matches!(
            self,
            MessageKind::Broadcast | MessageKind::SystemJoin | MessageKind::SystemLeave
        )
    }

    /// Whether messages of this kind are written to the durable log.
    pub fn is_persisted(self) -> bool {
        self == MessageKind::Broadcast
    }
}

/// Why an identity left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    /// The subscriber logged out.
    Unregistered,
    /// The subscriber stopped polling and was expired.
    Expired,
    /// The subscriber's mailbox overflowed under the disconnect policy.
    Overflow,
}

/// An immutable message with its dispatch-assigned sequence number.
///
/// Only the dispatcher constructs these; mailboxes and the history log share
/// them through [`Arc`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    seq: u64,
    kind: MessageKind,
    origin: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<IdentityId>,
    payload: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub(crate) fn sequenced(seq: u64, submission: Submission) -> Self {
        let Submission {
            kind,
            origin,
            target,
            payload,
        } = submission;
        Self {
            seq,
            kind,
            origin,
            target,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Position in the broker-wide total order.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Kind tag.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Identity that produced the message, if any.
    pub fn origin(&self) -> Option<&Identity> {
        self.origin.as_ref()
    }

    /// Recipient of a private message.
    pub fn target(&self) -> Option<IdentityId> {
        self.target
    }

    /// Opaque annotation payload.
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// When the dispatcher sequenced the message.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Result of a single mailbox fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// The next message in the subscriber's stream.
    Message(Arc<Message>),
    /// The wait elapsed with nothing queued.
    NoMessage,
    /// The mailbox is closed; no further messages will arrive.
    Done,
}

impl Delivery {
    /// Wraps a dequeued message, mapping the terminal marker to [`Delivery::Done`].
    pub(crate) fn from_queued(message: Arc<Message>) -> Self {
        if message.kind() == MessageKind::Done {
            Delivery::Done
        } else {
            Delivery::Message(message)
        }
    }

    /// Returns the message, if this delivery carries one.
    pub fn into_message(self) -> Option<Arc<Message>> {
        match self {
            Delivery::Message(message) => Some(message),
            Delivery::NoMessage | Delivery::Done => None,
        }
    }

    /// Whether this is the terminal result.
    pub fn is_done(&self) -> bool {
        matches!(self, Delivery::Done)
    }
}
