//! The single dispatcher task that owns the delivery order.
//!
//! Every state change that must be atomic with fan-out (registration,
//! unregistration, persistence retargeting, shutdown) travels through the same
//! queue as submissions and is applied inline between two messages.

use std::path::PathBuf;
use std::sync::Arc;

use annohub_core::config::OverflowPolicy;
use annohub_core::types::IdentityId;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::error::RegisterError;
use crate::history::HistoryLog;
use crate::message::{LeaveReason, Message, MessageKind, Submission};
use crate::metrics::BrokerMetrics;
use crate::persistence::SinkHandle;
use crate::subscriber::{Identity, IdentityHandle, IdentityRegistry, Mailbox, PushOutcome};

/// Reply channel for a registration request.
pub(crate) type RegisterReply = oneshot::Sender<Result<IdentityHandle, RegisterError>>;

/// Work items processed by the dispatcher, strictly in arrival order.
#[derive(Debug)]
pub(crate) enum Command {
    /// Sequence and route a message.
    Submit(Submission),
    /// Admit a new identity, replay history, and announce it.
    Register {
        identity: Identity,
        reply: RegisterReply,
    },
    /// Remove an identity and announce its departure.
    Unregister { id: IdentityId, reason: LeaveReason },
    /// Redirect or close the durable log.
    SetPersistenceTarget(Option<PathBuf>),
    /// Flush `Done` to every mailbox and stop.
    Shutdown,
}

/// State owned by the dispatcher task.
pub(crate) struct Dispatcher {
    rx: mpsc::UnboundedReceiver<Command>,
    registry: Arc<IdentityRegistry>,
    history: Arc<HistoryLog>,
    sink: SinkHandle,
    metrics: Arc<BrokerMetrics>,
    mailbox_bound: Option<(usize, OverflowPolicy)>,
    next_seq: u64,
}

impl Dispatcher {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<Command>,
        registry: Arc<IdentityRegistry>,
        history: Arc<HistoryLog>,
        sink: SinkHandle,
        metrics: Arc<BrokerMetrics>,
        mailbox_bound: Option<(usize, OverflowPolicy)>,
    ) -> Self {
        Self {
            rx,
            registry,
            history,
            sink,
            metrics,
            mailbox_bound,
            next_seq: 1,
        }
    }

    /// Drain the inbound queue until shutdown is requested or every sender is gone.
    pub(crate) async fn run(mut self) {
        info!("Dispatcher started");

        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Submit(submission) => self.dispatch(submission),
                Command::Register { identity, reply } => self.register(identity, reply),
                Command::Unregister { id, reason } => self.unregister(&id, reason),
                Command::SetPersistenceTarget(target) => self.sink.set_target(target),
                Command::Shutdown => break,
            }
        }

        self.finish().await;
    }

    fn sequence(&mut self, submission: Submission) -> Arc<Message> {
        let seq = self.next_seq;
        self.next_seq += 1;
        BrokerMetrics::incr(&self.metrics.dispatched);
        Arc::new(Message::sequenced(seq, submission))
    }

    fn dispatch(&mut self, submission: Submission) {
        let message = self.sequence(submission);

        trace!(seq = message.seq(), kind = ?message.kind(), "Dispatching message");

        if message.kind() == MessageKind::Private {
            self.deliver_private(&message);
            return;
        }

        if message.kind().is_recorded() {
            self.history.append(message.clone());
        }
        if message.kind().is_persisted() {
            self.sink.write(message.clone());
        }
        self.fan_out(&message);
    }

    fn deliver_private(&mut self, message: &Arc<Message>) {
        let Some(target) = message.target() else {
            return;
        };
        let Some(handle) = self.registry.get(&target) else {
            debug!(
                seq = message.seq(),
                target = %target,
                "Private message target is gone, dropping"
            );
            return;
        };
        if !self.push(&handle, message) {
            self.disconnect_overflowed(vec![handle]);
        }
    }

    fn fan_out(&mut self, message: &Arc<Message>) {
        let overflowed: Vec<IdentityHandle> = self
            .registry
            .handles()
            .into_iter()
            .filter(|handle| !self.push(handle, message))
            .collect();
        self.disconnect_overflowed(overflowed);
    }

    /// Push into one mailbox. Returns `false` when the subscriber must be disconnected.
    fn push(&self, handle: &IdentityHandle, message: &Arc<Message>) -> bool {
        match handle.mailbox().push(message.clone()) {
            PushOutcome::Queued => {
                BrokerMetrics::incr(&self.metrics.delivered);
                true
            }
            PushOutcome::Evicted => {
                BrokerMetrics::incr(&self.metrics.dropped);
                BrokerMetrics::incr(&self.metrics.delivered);
                true
            }
            // Unregister already in flight.
            PushOutcome::Closed => true,
            PushOutcome::Overflow => false,
        }
    }

    fn disconnect_overflowed(&mut self, handles: Vec<IdentityHandle>) {
        for handle in handles {
            warn!(
                identity_id = %handle.id(),
                name = %handle.identity().name,
                "Mailbox overflowed, disconnecting subscriber"
            );
            handle.mailbox().discard();
            self.unregister(&handle.id(), LeaveReason::Overflow);
        }
    }

    fn register(&mut self, identity: Identity, reply: RegisterReply) {
        let handle = IdentityHandle::new(identity, Mailbox::with_bound(self.mailbox_bound));

        if !self.registry.try_add(handle.clone()) {
            let identity = handle.identity();
            debug!(
                name = %identity.name,
                address = %identity.address,
                "Registration refused, name or address in use"
            );
            let _ = reply.send(Err(RegisterError::NameInUse {
                name: identity.name.clone(),
                address: identity.address.clone(),
            }));
            return;
        }

        handle.mailbox().replay(&self.history.snapshot());
        BrokerMetrics::incr(&self.metrics.registrations);
        info!(
            identity_id = %handle.id(),
            name = %handle.identity().name,
            replayed = handle.mailbox().len(),
            "Subscriber registered"
        );

        let join = Submission::system_join(handle.identity());
        if reply.send(Ok(handle.clone())).is_err() {
            // Caller went away before receiving its handle.
            debug!(identity_id = %handle.id(), "Registration abandoned by caller");
            handle.mailbox().discard();
            self.registry.remove(&handle.id());
            BrokerMetrics::incr(&self.metrics.unregistrations);
            return;
        }
        self.dispatch(join);
    }

    fn unregister(&mut self, id: &IdentityId, reason: LeaveReason) {
        let Some(handle) = self.registry.remove(id) else {
            return;
        };
        handle.mailbox().discard();
        BrokerMetrics::incr(&self.metrics.unregistrations);
        info!(
            identity_id = %handle.id(),
            name = %handle.identity().name,
            reason = ?reason,
            "Subscriber unregistered"
        );
        self.dispatch(Submission::system_leave(handle.identity(), reason));
    }

    async fn finish(mut self) {
        self.rx.close();
        let mut dropped = 0usize;
        // Dropping a queued registration's reply reports ShuttingDown to its caller.
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "Discarded commands queued behind shutdown");
        }

        let done = self.sequence(Submission::done());
        let handles = self.registry.drain();
        for handle in &handles {
            handle.mailbox().seal(done.clone());
        }
        info!(closed = handles.len(), "Dispatcher flushed Done to every mailbox");

        self.sink.shutdown().await;
        info!("Dispatcher stopped");
    }
}
