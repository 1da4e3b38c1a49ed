//! Append-only log of recorded broadcasts, replayed to late joiners.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::message::Message;

/// Ordered history of every recorded broadcast.
///
/// Appended only by the dispatcher. The lock is held just long enough to
/// append or to copy a snapshot.
#[derive(Debug, Default)]
pub struct HistoryLog {
    entries: Mutex<VecDeque<Arc<Message>>>,
    limit: Option<usize>,
}

impl HistoryLog {
    /// Creates an unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history that keeps at most `limit` entries, evicting the oldest.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            limit: limit.map(|l| l.max(1)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Arc<Message>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends a message. Returns `true` if an old entry was evicted.
    pub fn append(&self, message: Arc<Message>) -> bool {
        let mut entries = self.lock();
        entries.push_back(message);
        match self.limit {
            Some(limit) if entries.len() > limit => {
                entries.pop_front();
                true
            }
            _ => false,
        }
    }

    /// Point-in-time copy of the history, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<Message>> {
        self.lock().iter().cloned().collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::message::Submission;
    use crate::subscriber::Identity;

    fn message(seq: u64) -> Arc<Message> {
        let alice = Identity::new("alice", "a@x");
        Arc::new(Message::sequenced(seq, Submission::broadcast(&alice, json!(seq))))
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let history = HistoryLog::new();
        history.append(message(1));
        let snapshot = history.snapshot();
        history.append(message(2));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let history = HistoryLog::with_limit(Some(2));
        assert!(!history.append(message(1)));
        assert!(!history.append(message(2)));
        assert!(history.append(message(3)));

        let seqs: Vec<u64> = history.snapshot().iter().map(|m| m.seq()).collect();
        assert_eq!(seqs, vec![2, 3]);
    }
}
