//! Dedicated writer task that keeps file I/O off the dispatch path.
//!
//! The dispatcher enqueues commands in delivery order; a blocking task
//! applies them to the sink one at a time, so the log order always matches
//! the delivery order while a slow or failing disk never stalls fan-out.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::message::Message;
use crate::metrics::BrokerMetrics;

use super::sink::AnnotationSink;

#[derive(Debug)]
enum SinkCommand {
    Open(PathBuf),
    Write(Arc<Message>),
    Close,
}

/// Handle to the persistence writer task.
#[derive(Debug)]
pub struct SinkHandle {
    tx: mpsc::UnboundedSender<SinkCommand>,
    task: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the writer on the blocking pool. Must be called inside a runtime.
    pub fn spawn(sink: Box<dyn AnnotationSink>, metrics: Arc<BrokerMetrics>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::task::spawn_blocking(move || run_writer(sink, rx, metrics));
        Self { tx, task }
    }

    /// Redirect the log to `directory`, or close it when `None`.
    pub fn set_target(&self, directory: Option<PathBuf>) {
        let command = match directory {
            Some(dir) => SinkCommand::Open(dir),
            None => SinkCommand::Close,
        };
        let _ = self.tx.send(command);
    }

    /// Queue a record for writing.
    pub fn write(&self, message: Arc<Message>) {
        if self.tx.send(SinkCommand::Write(message)).is_err() {
            debug!("Persistence writer gone, record not written");
        }
    }

    /// Close the log and wait for every queued command to be applied.
    pub async fn shutdown(self) {
        let _ = self.tx.send(SinkCommand::Close);
        drop(self.tx);
        if let Err(e) = self.task.await {
            error!(error = %e, "Persistence writer task failed");
        }
    }
}

fn run_writer(
    mut sink: Box<dyn AnnotationSink>,
    mut rx: mpsc::UnboundedReceiver<SinkCommand>,
    metrics: Arc<BrokerMetrics>,
) {
    while let Some(command) = rx.blocking_recv() {
        match command {
            SinkCommand::Open(directory) => match sink.open(&directory) {
                Ok(()) => info!(directory = %directory.display(), "Annotation log opened"),
                Err(e) => error!(
                    directory = %directory.display(),
                    error = %e,
                    "Failed to open annotation log, continuing in memory"
                ),
            },
            SinkCommand::Write(message) => {
                if let Err(e) = sink.write(&message) {
                    BrokerMetrics::incr(&metrics.persistence_failures);
                    warn!(seq = message.seq(), error = %e, "Failed to persist annotation");
                }
            }
            SinkCommand::Close => {
                let was_open = sink.is_open();
                match sink.close() {
                    Ok(()) if was_open => info!("Annotation log closed"),
                    Ok(()) => {}
                    Err(e) => error!(error = %e, "Failed to close annotation log"),
                }
            }
        }
    }

    if let Err(e) = sink.close() {
        error!(error = %e, "Failed to close annotation log on exit");
    }
}
