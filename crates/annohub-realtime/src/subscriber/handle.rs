//! Identity records and the handle a registered subscriber holds.

use std::sync::Arc;

use annohub_core::types::IdentityId;
use serde::{Deserialize, Serialize};

use super::mailbox::Mailbox;

/// A registered participant: a unique name and a unique address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque identifier, also used as the session handle. Never serialized.
    #[serde(skip)]
    pub id: IdentityId,
    /// Display name, unique among registered identities.
    pub name: String,
    /// Contact address, unique among registered identities.
    pub address: String,
}

impl Identity {
    /// Create an identity with a fresh identifier.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: IdentityId::new(),
            name: name.into(),
            address: address.into(),
        }
    }
}

/// A registered identity together with the mailbox it exclusively owns.
///
/// Cheap to clone; every clone refers to the same mailbox.
#[derive(Debug, Clone)]
pub struct IdentityHandle {
    identity: Identity,
    mailbox: Arc<Mailbox>,
}

impl IdentityHandle {
    pub(crate) fn new(identity: Identity, mailbox: Mailbox) -> Self {
        Self {
            identity,
            mailbox: Arc::new(mailbox),
        }
    }

    /// Identifier of the underlying identity.
    pub fn id(&self) -> IdentityId {
        self.identity.id
    }

    /// The registered identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The subscriber's mailbox.
    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }
}
