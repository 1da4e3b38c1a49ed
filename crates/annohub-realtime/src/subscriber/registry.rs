//! Identity registry: unique names and addresses, each mapped to its mailbox.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use annohub_core::types::IdentityId;

use super::handle::IdentityHandle;

#[derive(Debug, Default)]
struct RegistryInner {
    names: HashMap<String, IdentityId>,
    addresses: HashSet<String>,
    by_id: HashMap<IdentityId, IdentityHandle>,
}

/// Thread-safe registry of every currently registered identity.
///
/// All three indexes live under one lock so the collision check and the
/// insert are a single atomic step.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    inner: Mutex<RegistryInner>,
}

impl IdentityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts the handle unless its name or address is already taken.
    pub fn try_add(&self, handle: IdentityHandle) -> bool {
        let mut inner = self.lock();
        let identity = handle.identity();
        if inner.names.contains_key(&identity.name)
            || inner.addresses.contains(&identity.address)
        {
            return false;
        }
        inner.names.insert(identity.name.clone(), handle.id());
        inner.addresses.insert(identity.address.clone());
        inner.by_id.insert(handle.id(), handle);
        true
    }

    /// Removes an identity and both of its index entries.
    pub fn remove(&self, id: &IdentityId) -> Option<IdentityHandle> {
        let mut inner = self.lock();
        let handle = inner.by_id.remove(id)?;
        inner.names.remove(&handle.identity().name);
        inner.addresses.remove(&handle.identity().address);
        Some(handle)
    }

    /// Looks up a registered identity.
    pub fn get(&self, id: &IdentityId) -> Option<IdentityHandle> {
        self.lock().by_id.get(id).cloned()
    }

    /// Looks up a registered identity by its name.
    pub fn find_by_name(&self, name: &str) -> Option<IdentityHandle> {
        let inner = self.lock();
        let id = inner.names.get(name)?;
        inner.by_id.get(id).cloned()
    }

    /// Snapshot of every registered handle.
    pub fn handles(&self) -> Vec<IdentityHandle> {
        self.lock().by_id.values().cloned().collect()
    }

    /// Removes every identity, returning the handles.
    pub fn drain(&self) -> Vec<IdentityHandle> {
        let mut inner = self.lock();
        inner.names.clear();
        inner.addresses.clear();
        inner.by_id.drain().map(|(_, handle)| handle).collect()
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    /// Whether nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
