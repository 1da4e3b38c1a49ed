//! Broadcast broker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Broadcast broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Default long-poll wait in seconds for a single `next` call.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_seconds: u64,
    /// Upper bound applied to caller-requested poll waits.
    #[serde(default = "default_max_poll_timeout")]
    pub max_poll_timeout_seconds: u64,
    /// Seconds without a poll after which a subscriber is expired.
    /// A value of `0` disables expiry.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Interval between idle-subscriber scans in seconds.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_seconds: u64,
    /// Maximum queued messages per mailbox. A value of `0` means unbounded.
    #[serde(default)]
    pub mailbox_capacity: usize,
    /// What happens when a bounded mailbox is full.
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    /// Maximum broadcasts retained for history replay. `0` means unbounded.
    #[serde(default)]
    pub history_limit: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            poll_timeout_seconds: default_poll_timeout(),
            max_poll_timeout_seconds: default_max_poll_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
            reap_interval_seconds: default_reap_interval(),
            mailbox_capacity: 0,
            overflow_policy: OverflowPolicy::default(),
            history_limit: 0,
        }
    }
}

impl BrokerConfig {
    /// Clamps a caller-requested wait to the configured maximum.
    pub fn clamp_poll_timeout(&self, requested: Option<u64>) -> Duration {
        let secs = requested
            .unwrap_or(self.poll_timeout_seconds)
            .min(self.max_poll_timeout_seconds);
        Duration::from_secs(secs)
    }

    /// Idle expiry window, or `None` when expiry is disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_seconds > 0).then(|| Duration::from_secs(self.idle_timeout_seconds))
    }

    /// Interval between reaper scans (never zero).
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_seconds.max(1))
    }

    /// Mailbox bound, or `None` when unbounded.
    pub fn mailbox_capacity(&self) -> Option<usize> {
        (self.mailbox_capacity > 0).then_some(self.mailbox_capacity)
    }

    /// History bound, or `None` when unbounded.
    pub fn history_limit(&self) -> Option<usize> {
        (self.history_limit > 0).then_some(self.history_limit)
    }
}

/// Policy applied when a bounded mailbox is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued message to make room.
    #[default]
    DropOldest,
    /// Unregister the slow subscriber.
    Disconnect,
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverflowPolicy::DropOldest => write!(f, "drop_oldest"),
            OverflowPolicy::Disconnect => write!(f, "disconnect"),
        }
    }
}

fn default_poll_timeout() -> u64 {
    10
}

fn default_max_poll_timeout() -> u64 {
    60
}

fn default_idle_timeout() -> u64 {
    20
}

fn default_reap_interval() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_poll_timeout() {
        let config = BrokerConfig::default();
        assert_eq!(config.clamp_poll_timeout(None), Duration::from_secs(10));
        assert_eq!(config.clamp_poll_timeout(Some(3)), Duration::from_secs(3));
        assert_eq!(config.clamp_poll_timeout(Some(600)), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_disables_bounds() {
        let config = BrokerConfig {
            idle_timeout_seconds: 0,
            ..BrokerConfig::default()
        };
        assert!(config.idle_timeout().is_none());
        assert!(config.mailbox_capacity().is_none());
        assert!(config.history_limit().is_none());
    }
}
