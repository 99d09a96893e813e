//! Timed status broadcasts.
//!
//! Every classified report gets one background task that walks
//! [`STATUS_SEQUENCE`]: it waits one tick, looks up the report's channel in
//! the [`Registry`], pushes the current label if the channel is open, and
//! moves on. Missed ticks are never replayed, so a client that registers
//! late only sees the remaining labels. After the last label the task ends
//! on its own.
//!
//! Tasks are spawned on a [`TaskTracker`] and share one
//! [`CancellationToken`], so [`Dispatcher::shutdown`] can stop and await all
//! of them.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument};

use crate::model::{STATUS_SEQUENCE, StatusUpdate};
use crate::registry::Registry;

/// Default delay between two status pushes.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(3);

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No client has registered for the report.
    Unregistered,
    /// The registered client has gone away.
    Closed,
}

/// Owns all in-flight status sequences.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Registry,
    tick_interval: Duration,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(registry: Registry, tick_interval: Duration) -> Self {
        Self {
            registry,
            tick_interval,
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Number of sequences that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Start the status sequence for a freshly classified report.
    ///
    /// Returns immediately; the first push happens one tick later.
    pub fn start_sequence(&self, report_id: impl Into<String>) {
        let report_id = report_id.into();
        let registry = self.registry.clone();
        let tick_interval = self.tick_interval;
        let shutdown = self.shutdown.clone();

        debug!(report_id = %report_id, "Starting status sequence");
        self.tasks
            .spawn(run_sequence(registry, report_id, tick_interval, shutdown));
    }

    /// Cancel every outstanding sequence and wait for the tasks to exit.
    pub async fn shutdown(&self) {
        let pending = self.tasks.len();
        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        info!(cancelled = pending, "Dispatcher stopped");
    }
}

#[instrument(skip(registry, shutdown))]
async fn run_sequence(
    registry: Registry,
    report_id: String,
    tick_interval: Duration,
    shutdown: CancellationToken,
) {
    for (step, status) in STATUS_SEQUENCE.into_iter().enumerate() {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(step, "Status sequence cancelled");
                return;
            }
            _ = tokio::time::sleep(tick_interval) => {}
        }

        let delivery = deliver(&registry, &report_id, StatusUpdate { status });
        debug!(step, status = status.label(), ?delivery, "Status tick");
    }

    debug!("Status sequence complete");
}

fn deliver(registry: &Registry, report_id: &str, update: StatusUpdate) -> Delivery {
    let Some(sender) = registry.lookup(report_id) else {
        return Delivery::Unregistered;
    };

    // The receiver can close between the check and the send.
    if sender.is_closed() || sender.send(update).is_err() {
        return Delivery::Closed;
    }

    Delivery::Sent
}
