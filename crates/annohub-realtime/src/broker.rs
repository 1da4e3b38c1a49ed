//! Top-level broker that ties the dispatcher, registry, history, and log together.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use annohub_core::config::{BrokerConfig, PersistenceConfig};
use annohub_core::error::AppError;
use annohub_core::result::AppResult;
use annohub_core::types::IdentityId;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatcher::{Command, Dispatcher};
use crate::error::RegisterError;
use crate::history::HistoryLog;
use crate::message::{Delivery, LeaveReason, Submission};
use crate::metrics::{BrokerMetrics, MetricsSnapshot};
use crate::persistence::{AnnotationSink, FileSink, SinkHandle};
use crate::subscriber::reaper::run_reaper;
use crate::subscriber::{Identity, IdentityHandle, IdentityRegistry};

/// Broker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerState {
    /// Constructed; commands queue up until [`Broker::start`].
    Created,
    /// The dispatcher is draining the inbound queue.
    Running,
    /// A stop was requested; new work is refused.
    ShuttingDown,
    /// Every mailbox has been closed and the log flushed.
    Stopped,
}

impl BrokerState {
    /// Whether new registrations and submissions are accepted.
    pub fn is_accepting(self) -> bool {
        matches!(self, BrokerState::Created | BrokerState::Running)
    }
}

impl std::fmt::Display for BrokerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerState::Created => write!(f, "created"),
            BrokerState::Running => write!(f, "running"),
            BrokerState::ShuttingDown => write!(f, "shutting_down"),
            BrokerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Parts consumed by [`Broker::start`].
struct Pending {
    rx: mpsc::UnboundedReceiver<Command>,
    sink: Box<dyn AnnotationSink>,
    target: Option<PathBuf>,
}

struct BrokerInner {
    config: BrokerConfig,
    tx: mpsc::UnboundedSender<Command>,
    pending: Mutex<Option<Pending>>,
    registry: Arc<IdentityRegistry>,
    history: Arc<HistoryLog>,
    metrics: Arc<BrokerMetrics>,
    state: watch::Sender<BrokerState>,
    tasks: Mutex<Tasks>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Tasks {
    dispatcher: Option<JoinHandle<()>>,
    reaper: Option<JoinHandle<()>>,
}

/// Broadcast broker for one live annotation session.
///
/// Cheap to clone; all clones drive the same dispatcher.
#[derive(Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("state", &self.state())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Broker {
    /// Creates a broker that logs broadcasts to `persistence.file_name`
    /// inside `persistence.store_directory`, if one is configured.
    pub fn new(config: BrokerConfig, persistence: &PersistenceConfig) -> Self {
        Self::with_sink(
            config,
            Box::new(FileSink::new(persistence.file_name.clone())),
            persistence.store_directory.clone(),
        )
    }

    /// Creates a broker around an arbitrary sink, opened on `target` at start.
    pub fn with_sink(
        config: BrokerConfig,
        sink: Box<dyn AnnotationSink>,
        target: Option<PathBuf>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(BrokerState::Created);

        Self {
            inner: Arc::new(BrokerInner {
                history: Arc::new(HistoryLog::with_limit(config.history_limit())),
                config,
                tx,
                pending: Mutex::new(Some(Pending { rx, sink, target })),
                registry: Arc::new(IdentityRegistry::new()),
                metrics: Arc::new(BrokerMetrics::new()),
                state,
                tasks: Mutex::new(Tasks::default()),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Spawns the dispatcher and the idle reaper. Must be called inside a runtime.
    pub fn start(&self) -> AppResult<()> {
        let pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| AppError::conflict("Broker has already been started"))?;

        let sink = SinkHandle::spawn(pending.sink, self.inner.metrics.clone());
        if let Some(target) = pending.target {
            sink.set_target(Some(target));
        }

        let mailbox_bound = self
            .inner
            .config
            .mailbox_capacity()
            .map(|capacity| (capacity, self.inner.config.overflow_policy));
        let dispatcher = Dispatcher::new(
            pending.rx,
            self.inner.registry.clone(),
            self.inner.history.clone(),
            sink,
            self.inner.metrics.clone(),
            mailbox_bound,
        );

        let mut tasks = self.inner.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.dispatcher = Some(tokio::spawn(dispatcher.run()));

        if let Some(idle_timeout) = self.inner.config.idle_timeout() {
            tasks.reaper = Some(tokio::spawn(run_reaper(
                self.clone(),
                idle_timeout,
                self.inner.config.reap_interval(),
                self.inner.cancel.clone(),
            )));
        }
        drop(tasks);

        self.inner.state.send_replace(BrokerState::Running);
        info!(
            idle_timeout_secs = self.inner.config.idle_timeout_seconds,
            mailbox_capacity = self.inner.config.mailbox_capacity,
            overflow_policy = %self.inner.config.overflow_policy,
            "Broker started"
        );
        Ok(())
    }

    /// Enqueues a message for dispatch and returns immediately.
    ///
    /// Dropped without error once the broker is shutting down.
    pub fn submit(&self, submission: Submission) {
        if !self.state().is_accepting() {
            debug!(kind = ?submission.kind(), "Broker not accepting, submission dropped");
            return;
        }
        BrokerMetrics::incr(&self.inner.metrics.submitted);
        let _ = self.inner.tx.send(Command::Submit(submission));
    }

    /// Registers a new identity.
    ///
    /// The new mailbox first receives the full history, then the identity's
    /// own join announcement, then live traffic.
    pub async fn register(
        &self,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Result<IdentityHandle, RegisterError> {
        if !self.state().is_accepting() {
            return Err(RegisterError::ShuttingDown);
        }

        let (reply, response) = oneshot::channel();
        let command = Command::Register {
            identity: Identity::new(name, address),
            reply,
        };
        if self.inner.tx.send(command).is_err() {
            return Err(RegisterError::ShuttingDown);
        }
        response.await.unwrap_or(Err(RegisterError::ShuttingDown))
    }

    /// Unregisters an identity. Idempotent.
    ///
    /// The mailbox is closed before this returns, so a pending or later
    /// [`Broker::next`] yields [`Delivery::Done`].
    pub fn unregister(&self, handle: &IdentityHandle) {
        self.remove(handle, LeaveReason::Unregistered);
    }

    pub(crate) fn expire(&self, handle: &IdentityHandle) {
        if handle.mailbox().is_closed() {
            return;
        }
        BrokerMetrics::incr(&self.inner.metrics.expired);
        info!(
            identity_id = %handle.id(),
            name = %handle.identity().name,
            "Expiring idle subscriber"
        );
        self.remove(handle, LeaveReason::Expired);
    }

    fn remove(&self, handle: &IdentityHandle, reason: LeaveReason) {
        handle.mailbox().discard();
        let _ = self.inner.tx.send(Command::Unregister {
            id: handle.id(),
            reason,
        });
    }

    /// Looks up a live session by identity id.
    pub fn session(&self, id: IdentityId) -> Option<IdentityHandle> {
        self.inner.registry.get(&id)
    }

    /// Looks up a live session by registered name.
    pub fn find(&self, name: &str) -> Option<IdentityHandle> {
        self.inner.registry.find_by_name(name)
    }

    /// Fetches the next delivery for `handle`, waiting at most `timeout`.
    pub async fn next(&self, handle: &IdentityHandle, timeout: Duration) -> Delivery {
        handle.mailbox().next(timeout).await
    }

    /// Redirects the durable log to a new directory, or closes it with `None`.
    ///
    /// Applied in order with dispatch, so every broadcast before this call
    /// lands in the old file and every one after it in the new file.
    pub fn set_persistence_target(&self, directory: Option<PathBuf>) {
        if !self.state().is_accepting() {
            return;
        }
        let _ = self
            .inner
            .tx
            .send(Command::SetPersistenceTarget(directory));
    }

    /// Stops the broker, flushing `Done` to every mailbox and closing the log.
    ///
    /// Commands queued before the stop are processed first. If the dispatcher
    /// has not finished within `grace` it is aborted and mailboxes are closed
    /// directly. Calling this more than once waits for the first stop.
    pub async fn stop(&self, grace: Duration) -> AppResult<()> {
        let mut previous = BrokerState::Stopped;
        let transitioned = self.inner.state.send_if_modified(|state| {
            previous = *state;
            if state.is_accepting() {
                *state = BrokerState::ShuttingDown;
                true
            } else {
                false
            }
        });

        if !transitioned {
            let mut rx = self.inner.state.subscribe();
            let _ = rx.wait_for(|state| *state == BrokerState::Stopped).await;
            return Ok(());
        }

        info!(from = %previous, "Broker shutting down");
        self.inner.cancel.cancel();

        let (dispatcher, reaper) = {
            let mut tasks = self.inner.tasks.lock().unwrap_or_else(|e| e.into_inner());
            (tasks.dispatcher.take(), tasks.reaper.take())
        };

        let result = match dispatcher {
            Some(handle) => {
                let _ = self.inner.tx.send(Command::Shutdown);
                self.await_dispatcher(handle, grace).await
            }
            None => {
                // Never started: release queued registrations and the sink.
                self.inner
                    .pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .take();
                Ok(())
            }
        };

        if let Some(reaper) = reaper {
            if let Err(e) = reaper.await {
                warn!(error = %e, "Idle reaper ended abnormally");
            }
        }

        self.inner.state.send_replace(BrokerState::Stopped);
        info!("Broker stopped");
        result
    }

    async fn await_dispatcher(&self, mut handle: JoinHandle<()>, grace: Duration) -> AppResult<()> {
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!(error = %e, "Dispatcher task failed");
                self.force_close();
                Err(AppError::internal(format!("Dispatcher task failed: {e}")))
            }
            Err(_) => {
                warn!(
                    grace_secs = grace.as_secs(),
                    "Dispatcher did not finish within grace period, aborting"
                );
                handle.abort();
                self.force_close();
                Ok(())
            }
        }
    }

    fn force_close(&self) {
        for handle in self.inner.registry.drain() {
            handle.mailbox().close();
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BrokerState {
        *self.inner.state.borrow()
    }

    /// Number of registered identities.
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of messages retained for replay.
    pub fn history_len(&self) -> usize {
        self.inner.history.len()
    }

    /// Snapshot of the broker counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub(crate) fn handles(&self) -> Vec<IdentityHandle> {
        self.inner.registry.handles()
    }
}
