//! Per-subscriber ordered inbox with timeout-bounded, wake-on-close fetches.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use annohub_core::config::OverflowPolicy;
use tokio::sync::Notify;
use tokio::time::{self, Instant};

use crate::message::{Delivery, Message};

/// Result of pushing a message into a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The message was appended.
    Queued,
    /// The message was appended after evicting the oldest queued message.
    Evicted,
    /// The mailbox is full and its policy is to disconnect; nothing was queued.
    Overflow,
    /// The mailbox is closed; the message was dropped.
    Closed,
}

#[derive(Debug, Default)]
struct MailboxState {
    queue: VecDeque<Arc<Message>>,
    /// Replayed history entries still at the head of `queue`.
    replayed: usize,
    closed: bool,
}

impl MailboxState {
    /// Queued messages that count against the bound.
    fn live(&self) -> usize {
        self.queue.len() - self.replayed
    }

    fn pop_front(&mut self) -> Option<Arc<Message>> {
        let message = self.queue.pop_front()?;
        self.replayed = self.replayed.saturating_sub(1);
        Some(message)
    }
}

/// A subscriber's private FIFO inbox.
///
/// The dispatcher pushes; one consumer fetches with [`Mailbox::next`].
#[derive(Debug)]
pub struct Mailbox {
    state: Mutex<MailboxState>,
    notify: Notify,
    bound: Option<(usize, OverflowPolicy)>,
    last_poll: Mutex<Instant>,
    polls_in_flight: AtomicUsize,
}

impl Mailbox {
    /// Create an unbounded mailbox.
    pub fn new() -> Self {
        Self::with_bound(None)
    }

    /// Create a mailbox holding at most `capacity` live messages.
    #[cfg(test)]
    pub(crate) fn bounded(capacity: usize, policy: OverflowPolicy) -> Self {
        Self::with_bound(Some((capacity.max(1), policy)))
    }

    pub(crate) fn with_bound(bound: Option<(usize, OverflowPolicy)>) -> Self {
        Self {
            state: Mutex::new(MailboxState::default()),
            notify: Notify::new(),
            bound,
            last_poll: Mutex::new(Instant::now()),
            polls_in_flight: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MailboxState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a message to the tail and wake a blocked reader.
    ///
    /// Closed mailboxes silently drop the message. Replayed history still
    /// waiting to be read does not count against the bound.
    pub fn push(&self, message: Arc<Message>) -> PushOutcome {
        let outcome = {
            let mut state = self.lock();
            if state.closed {
                return PushOutcome::Closed;
            }
            match self.bound {
                Some((capacity, policy)) if state.live() >= capacity => match policy {
                    OverflowPolicy::DropOldest => {
                        let oldest_live = state.replayed;
                        state.queue.remove(oldest_live);
                        state.queue.push_back(message);
                        PushOutcome::Evicted
                    }
                    OverflowPolicy::Disconnect => return PushOutcome::Overflow,
                },
                _ => {
                    state.queue.push_back(message);
                    PushOutcome::Queued
                }
            }
        };
        self.notify.notify_waiters();
        outcome
    }

    /// Queue a history snapshot ahead of any live message.
    ///
    /// Replay is not subject to the mailbox bound.
    pub(crate) fn replay(&self, history: &[Arc<Message>]) {
        if history.is_empty() {
            return;
        }
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            // Replay happens before any live push, so the backlog sits at the head.
            state.queue.extend(history.iter().cloned());
            state.replayed += history.len();
        }
        self.notify.notify_waiters();
    }

    /// Fetch the next message, waiting up to `timeout` for one to arrive.
    ///
    /// Returns [`Delivery::NoMessage`] when the wait elapses and
    /// [`Delivery::Done`] once the mailbox is closed and drained.
    pub async fn next(&self, timeout: Duration) -> Delivery {
        let _poll = PollGuard::enter(self);
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the queue so a push in between is not missed.
            notified.as_mut().enable();

            if let Some(delivery) = self.try_next() {
                return delivery;
            }

            if time::timeout_at(deadline, notified).await.is_err() {
                return Delivery::NoMessage;
            }
        }
    }

    /// Pop the head without waiting.
    pub fn try_next(&self) -> Option<Delivery> {
        let mut state = self.lock();
        if let Some(message) = state.pop_front() {
            return Some(Delivery::from_queued(message));
        }
        state.closed.then_some(Delivery::Done)
    }

    /// Close the mailbox and wake every blocked reader. Idempotent.
    ///
    /// Messages already queued remain readable.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// Append the terminal marker past any bound, then close.
    pub(crate) fn seal(&self, done: Arc<Message>) {
        {
            let mut state = self.lock();
            if !state.closed {
                state.queue.push_back(done);
                state.closed = true;
            }
        }
        self.notify.notify_waiters();
    }

    /// Drop everything queued and close.
    pub fn discard(&self) {
        {
            let mut state = self.lock();
            state.queue.clear();
            state.replayed = 0;
            state.closed = true;
        }
        self.notify.notify_waiters();
    }

    /// Whether the mailbox has been closed.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time since the consumer last polled, or `None` while a poll is pending.
    pub fn idle_for(&self) -> Option<Duration> {
        if self.polls_in_flight.load(Ordering::SeqCst) > 0 {
            return None;
        }
        let last = *self.last_poll.lock().unwrap_or_else(|e| e.into_inner());
        Some(Instant::now().saturating_duration_since(last))
    }

    fn touch(&self) {
        *self.last_poll.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

struct PollGuard<'a> {
    mailbox: &'a Mailbox,
}

impl<'a> PollGuard<'a> {
    fn enter(mailbox: &'a Mailbox) -> Self {
        mailbox.polls_in_flight.fetch_add(1, Ordering::SeqCst);
        mailbox.touch();
        Self { mailbox }
    }
}

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        self.mailbox.touch();
        self.mailbox.polls_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
