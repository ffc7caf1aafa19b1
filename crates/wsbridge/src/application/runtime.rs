//! Event loop that feeds the orchestrator.
//!
//! One task owns the [`NotificationIntake`] and a heartbeat ticker and calls
//! into the orchestrator for each of them in turn.  The heartbeat re-runs the
//! same evaluation a notification would; it is what catches a pump whose
//! exit notification could not be queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::intake::NotificationIntake;
use super::orchestrator::{Orchestrator, TransitionOutcome};

/// Shortest heartbeat accepted; a zero interval would spin.
const MIN_HEARTBEAT: Duration = Duration::from_millis(10);

/// Handle to the running event loop.
#[derive(Debug)]
pub struct BridgeRuntime {
    orchestrator: Arc<Orchestrator>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl BridgeRuntime {
    /// Spawns the event loop and runs one evaluation immediately.
    pub fn initialize(
        orchestrator: Arc<Orchestrator>,
        intake: NotificationIntake,
        heartbeat: Duration,
    ) -> Self {
        let heartbeat = heartbeat.max(MIN_HEARTBEAT);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_event_loop(
            Arc::clone(&orchestrator),
            intake,
            heartbeat,
            shutdown_rx,
        ));
        info!(heartbeat_ms = heartbeat.as_millis() as u64, "bridge runtime started");
        Self {
            orchestrator,
            shutdown_tx,
            task,
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Stops the event loop, then stops any relay session.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("event loop ended abnormally: {e}");
        }
        self.orchestrator.shutdown().await;
        info!("bridge runtime stopped");
    }
}

async fn run_event_loop(
    orchestrator: Arc<Orchestrator>,
    mut intake: NotificationIntake,
    heartbeat: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut intake_open = true;

    loop {
        let outcome = tokio::select! {
            biased;

            _ = shutdown_rx.changed() => break,

            notification = intake.recv(), if intake_open => match notification {
                Some(notification) => {
                    debug!(kind = notification.kind(), "notification received");
                    orchestrator.handle_notification(notification).await
                }
                None => {
                    debug!("all notifiers dropped; continuing on heartbeat only");
                    intake_open = false;
                    continue;
                }
            },

            _ = ticker.tick() => orchestrator.evaluate().await,
        };

        match outcome {
            TransitionOutcome::Started(id) => debug!(session = %id, "evaluation started a session"),
            TransitionOutcome::Stopped => debug!("evaluation stopped the session"),
            TransitionOutcome::Abandoned(_) | TransitionOutcome::Unchanged => {}
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
