//! Builders for messages submitted to the broker before they are sequenced.

use annohub_core::types::IdentityId;
use serde_json::json;

use crate::subscriber::Identity;

use super::types::{LeaveReason, MessageKind};

/// A message waiting in the inbound queue.
///
/// Producers can only build broadcast and private submissions; system and
/// terminal kinds are created by the broker itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub(crate) kind: MessageKind,
    pub(crate) origin: Option<Identity>,
    pub(crate) target: Option<IdentityId>,
    pub(crate) payload: serde_json::Value,
}

impl Submission {
    /// An annotation for every subscriber.
    pub fn broadcast(origin: &Identity, payload: serde_json::Value) -> Self {
        Self {
            kind: MessageKind::Broadcast,
            origin: Some(origin.clone()),
            target: None,
            payload,
        }
    }

    /// A message for a single subscriber.
    pub fn private(origin: &Identity, target: IdentityId, payload: serde_json::Value) -> Self {
        Self {
            kind: MessageKind::Private,
            origin: Some(origin.clone()),
            target: Some(target),
            payload,
        }
    }

    pub(crate) fn system_join(identity: &Identity) -> Self {
        Self {
            kind: MessageKind::SystemJoin,
            origin: Some(identity.clone()),
            target: None,
            payload: json!({
                "name": identity.name,
                "address": identity.address,
            }),
        }
    }

    pub(crate) fn system_leave(identity: &Identity, reason: LeaveReason) -> Self {
        Self {
            kind: MessageKind::SystemLeave,
            origin: Some(identity.clone()),
            target: None,
            payload: json!({
                "name": identity.name,
                "address": identity.address,
                "reason": reason,
            }),
        }
    }

    pub(crate) fn done() -> Self {
        Self {
            kind: MessageKind::Done,
            origin: None,
            target: None,
            payload: serde_json::Value::Null,
        }
    }

    /// Kind this submission will be dispatched as.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }
}
