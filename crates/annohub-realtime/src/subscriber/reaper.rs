//! Periodic expiry of subscribers that stopped polling.

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::broker::Broker;

/// Run the idle reaper until `cancel` fires.
///
/// Every `interval`, any subscriber whose last poll ended more than
/// `idle_timeout` ago is unregistered with an expiry announcement. A subscriber
/// blocked in a poll is never considered idle.
pub async fn run_reaper(
    broker: Broker,
    idle_timeout: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        for handle in broker.handles() {
            match handle.mailbox().idle_for() {
                Some(idle) if idle > idle_timeout => broker.expire(&handle),
                _ => {}
            }
        }
    }

    debug!("Idle reaper stopped");
}
