// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Periodic driver for [`SyncController::on_schedule_tick`].
//!
//! Hosts with their own scheduler (an OS alarm, a job queue) can call
//! `on_schedule_tick` directly and skip this module.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{SyncController, TickOutcome};

/// A running schedule. Dropping the handle also stops the task.
pub struct ScheduleHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ScheduleHandle {
    /// Spawn the tick loop. The first tick fires one `period` after arming.
    pub fn arm(controller: Arc<SyncController>, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        info!(period_secs = period.as_secs_f64(), "Sync schedule armed");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }

                    _ = ticker.tick() => {
                        match controller.on_schedule_tick().await {
                            TickOutcome::Skipped => debug!("Scheduled tick skipped"),
                            TickOutcome::Completed(outcome) if outcome.is_success() => {
                                debug!(%outcome, "Scheduled sync finished");
                            }
                            TickOutcome::Completed(outcome) => {
                                warn!(%outcome, "Scheduled sync failed");
                            }
                        }
                    }
                }
            }

            info!("Sync schedule disarmed");
        });

        Self {
            shutdown,
            task: Some(task),
        }
    }

    /// Arm with the controller's configured `sync_interval`.
    pub fn arm_default(controller: Arc<SyncController>) -> Self {
        let period = controller.config().sync_interval();
        Self::arm(controller, period)
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the loop and wait for it. A sync in progress finishes first.
    pub async fn disarm(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Schedule task ended abnormally");
            }
        }
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
