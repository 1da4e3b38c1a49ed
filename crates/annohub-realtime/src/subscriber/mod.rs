//! Subscriber management: identities, mailboxes, the registry, and idle expiry.

pub mod handle;
pub mod mailbox;
pub mod reaper;
pub mod registry;

pub use handle::{Identity, IdentityHandle};
pub use mailbox::{Mailbox, PushOutcome};
pub use registry::IdentityRegistry;
