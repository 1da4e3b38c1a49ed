//! Broker metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Broker-level counters.
#[derive(Debug, Default)]
pub struct BrokerMetrics {
    /// Submissions accepted into the inbound queue
    pub submitted: AtomicU64,
    /// Messages sequenced by the dispatcher
    pub dispatched: AtomicU64,
    /// Individual mailbox deliveries
    pub delivered: AtomicU64,
    /// Messages evicted from full mailboxes
    pub dropped: AtomicU64,
    /// Successful registrations
    pub registrations: AtomicU64,
    /// Identities removed for any reason
    pub unregistrations: AtomicU64,
    /// Identities removed by the idle reaper
    pub expired: AtomicU64,
    /// Durable log writes that failed
    pub persistence_failures: AtomicU64,
}

impl BrokerMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
            unregistrations: self.unregistrations.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Submissions accepted
    pub submitted: u64,
    /// Messages sequenced
    pub dispatched: u64,
    /// Mailbox deliveries
    pub delivered: u64,
    /// Messages evicted from full mailboxes
    pub dropped: u64,
    /// Successful registrations
    pub registrations: u64,
    /// Identities removed
    pub unregistrations: u64,
    /// Identities expired for inactivity
    pub expired: u64,
    /// Failed durable log writes
    pub persistence_failures: u64,
}
