//! Periodic pass scheduling
//!
//! The [`Scheduler`] asks the engine for a pass once per update interval. The
//! first tick fires one full interval after spawning, because
//! [`DdnsEngine::start`] already runs a pass. Interval changes published by
//! [`DdnsEngine::reconfigure`] restart the timer; a pass that is in flight
//! always finishes first.

use crate::engine::DdnsEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info, warn};

/// Drives [`DdnsEngine::scheduled_pass`] at the configured interval
pub struct Scheduler {
    engine: Arc<DdnsEngine>,
}

impl Scheduler {
    pub fn new(engine: Arc<DdnsEngine>) -> Self {
        Self { engine }
    }

    /// Run the loop on a background task
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown_rx));

        SchedulerHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }

    /// Run the loop until `shutdown` fires or its sender is dropped
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut intervals = self.engine.interval_updates();
        let mut period = *intervals.borrow_and_update();
        let mut ticks = ticker(period);
        info!("Scheduler started, interval {}s", period.as_secs());

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Scheduler shutting down");
                    break;
                }

                changed = intervals.changed() => {
                    if changed.is_err() {
                        warn!("Interval channel closed, scheduler exiting");
                        break;
                    }
                    let next = *intervals.borrow_and_update();
                    if next != period {
                        info!(
                            "Update interval changed from {}s to {}s",
                            period.as_secs(),
                            next.as_secs()
                        );
                        period = next;
                        ticks = ticker(period);
                    }
                }

                Some(_) = ticks.next() => {
                    match self.engine.scheduled_pass().await {
                        Some(report) => debug!(success = report.success, "Scheduled pass done"),
                        None => debug!("Scheduled tick while stopped"),
                    }
                }
            }
        }
    }
}

fn ticker(period: Duration) -> IntervalStream {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    IntervalStream::new(interval)
}

/// Handle to a spawned [`Scheduler`]
pub struct SchedulerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop and wait for it to exit
    ///
    /// A pass already running completes before this returns.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            warn!("Scheduler task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
