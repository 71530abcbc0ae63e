//! Reconnect-driven replay and the background worker that drives it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connectivity::{ConnectivityMonitor, Transition};
use crate::error::QueueError;
use crate::queue::{ActionQueue, ReplayReport};

/// What one [`SyncCoordinator::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTick {
    pub transition: Transition,
    /// `None` when offline or nothing was queued.
    pub report: Option<ReplayReport>,
}

/// Ties connectivity to the action queue.
#[derive(Debug)]
pub struct SyncCoordinator {
    monitor: Arc<ConnectivityMonitor>,
    queue: Arc<ActionQueue>,
}

impl SyncCoordinator {
    pub fn new(monitor: Arc<ConnectivityMonitor>, queue: Arc<ActionQueue>) -> Self {
        Self { monitor, queue }
    }

    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    /// Probe, then replay if online and anything is queued. Covers both the
    /// reconnect case and entries whose backoff elapsed while online.
    pub async fn tick(&self) -> Result<SyncTick, QueueError> {
        let transition = self.monitor.refresh().await;

        if !self.monitor.is_online() {
            debug!("offline, skipping replay");
            return Ok(SyncTick {
                transition,
                report: None,
            });
        }

        let queued = self.queue.len().await?;
        if queued == 0 {
            return Ok(SyncTick {
                transition,
                report: None,
            });
        }

        if transition == Transition::CameOnline {
            info!(queued, "back online, replaying queued actions");
        }
        let report = self.queue.replay_all().await?;
        Ok(SyncTick {
            transition,
            report: Some(report),
        })
    }
}

/// Runs [`SyncCoordinator::tick`] on a fixed interval.
pub struct SyncWorker;

impl SyncWorker {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(coordinator: Arc<SyncCoordinator>, interval: Duration) -> SyncWorkerHandle {
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);

        let join = tokio::spawn(async move {
            info!(?interval, "sync worker started");

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = signal.notified() => {
                        info!("sync worker received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        match coordinator.tick().await {
                            Ok(SyncTick { report: Some(report), .. }) if !report.is_empty() => {
                                debug!(?report, "sync tick replayed actions");
                            }
                            Ok(_) => {}
                            Err(err) => warn!(error = %err, "sync tick failed"),
                        }
                    }
                }
            }

            info!("sync worker stopped");
        });

        SyncWorkerHandle { shutdown, join }
    }
}

/// Handle to a running [`SyncWorker`].
#[derive(Debug)]
pub struct SyncWorkerHandle {
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
}

impl SyncWorkerHandle {
    /// Stop the worker and wait for it to exit. A tick in progress finishes
    /// first.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(err) = self.join.await {
            warn!(error = %err, "sync worker task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
