//! Periodic expiry sweep
//!
//! [`ExpirySweeper`] moves lapsed active subscriptions to `expired` on a
//! fixed interval. A failed run changes nothing and is retried on the next
//! tick; errors are logged, never returned.

use platform_store::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::SubscriptionEngine;

/// Runs the expiry sweep against an engine.
pub struct ExpirySweeper<S> {
    engine: Arc<SubscriptionEngine<S>>,
    interval: Duration,
}

impl<S> std::fmt::Debug for ExpirySweeper<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirySweeper")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl<S> ExpirySweeper<S>
where
    S: Store + 'static,
{
    /// Creates a sweeper using the engine's configured interval.
    pub fn new(engine: Arc<SubscriptionEngine<S>>) -> Self {
        let interval = engine.config().sweep_interval();
        Self { engine, interval }
    }

    /// Override the interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sweep once at the engine clock's current instant.
    ///
    /// Returns the number of subscriptions expired; 0 when the sweep failed.
    pub async fn run_once(&self) -> u64 {
        let now = self.engine.now();
        match self.engine.sweep_expired_subscriptions(now).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Expiry sweep failed, retrying next interval");
                0
            }
        }
    }

    /// Start sweeping in a background task.
    ///
    /// The first sweep runs immediately. Ticks missed while a sweep is slow
    /// are skipped rather than replayed.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            info!(interval_secs = self.interval.as_secs(), "Expiry sweeper started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        let count = self.run_once().await;
                        debug!(count, "Expiry sweep finished");
                    }
                }
            }

            info!("Expiry sweeper stopped");
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the loop and wait for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Expiry sweeper task ended abnormally");
        }
    }
}
