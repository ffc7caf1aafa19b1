//! Orchestrator: keeps the relay session consistent with the connectivity gate.
//!
//! Every notification and every heartbeat tick ends up in [`Orchestrator::evaluate`],
//! which reads the gate fresh from the [`SignalRegistry`], derives the session
//! state and applies the [`TransitionPlan`] returned by [`plan`].
//!
//! # Single writer
//!
//! The whole evaluate routine runs while holding the async session mutex, so
//! two evaluations never interleave.  A notification that arrives mid-pass
//! simply queues behind the lock and re-reads the gate when its turn comes.
//!
//! # Stream ownership
//!
//! Each stream pair acquired from a transport is released exactly once, on
//! every path that gives it up: a normal stop, a restart, shutdown, and a
//! start that fails half way.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex as StdMutex, PoisonError,
};

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use wsbridge_core::{
    plan, BridgeNotification, BridgeStatus, SessionState, SignalRegistry, SignalSnapshot,
    TransitionPlan,
};

use super::intake::BridgeNotifier;
use super::relay_session::RelaySession;
use super::transport::Transport;
use crate::domain::RelaySettings;

/// Why a start attempt was abandoned.  Never fatal; the next pass retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("{transport} transport has no stream pair to lend")]
    TransportUnavailable { transport: String },
}

/// What one evaluation pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The session already matched the gate.
    Unchanged,
    /// A new session was started (possibly after tearing down a stale one).
    Started(Uuid),
    /// The session was torn down and not replaced.
    Stopped,
    /// A start was attempted and given up; no session exists.
    Abandoned(StartError),
}

#[derive(Debug, Default)]
struct TrafficState {
    slow: bool,
    message: Option<String>,
}

/// Owns the signal registry and the (at most one) relay session.
pub struct Orchestrator {
    device: Arc<dyn Transport>,
    network: Arc<dyn Transport>,
    notifier: Option<BridgeNotifier>,
    settings: RelaySettings,
    signals: SignalRegistry,
    session: Mutex<Option<RelaySession>>,
    traffic: StdMutex<TrafficState>,
    closed: AtomicBool,
    status_tx: watch::Sender<BridgeStatus>,
}

impl Orchestrator {
    /// Creates a stopped orchestrator with all signals `false`.
    ///
    /// `notifier` is handed to every relay pump so that a pump dying on its
    /// own triggers an immediate re-evaluation.  Pass `None` to rely on the
    /// heartbeat alone.
    pub fn new(
        device: Arc<dyn Transport>,
        network: Arc<dyn Transport>,
        notifier: Option<BridgeNotifier>,
        settings: RelaySettings,
    ) -> Self {
        let (status_tx, _) = watch::channel(BridgeStatus::default());
        Self {
            device,
            network,
            notifier,
            settings,
            signals: SignalRegistry::new(),
            session: Mutex::new(None),
            traffic: StdMutex::new(TrafficState::default()),
            closed: AtomicBool::new(false),
            status_tx,
        }
    }

    /// Applies a notification and runs a full evaluation pass.
    ///
    /// The pass runs even when the notification did not change anything, so
    /// a notification that lost a race with an opposite one still converges
    /// on the latest gate value.
    pub async fn handle_notification(&self, notification: BridgeNotification) -> TransitionOutcome {
        match &notification {
            BridgeNotification::TrafficQuality { slow, message } => {
                let mut traffic = self.traffic.lock().unwrap_or_else(PoisonError::into_inner);
                if traffic.slow != *slow {
                    info!(slow, "traffic quality changed: {message}");
                }
                traffic.slow = *slow;
                traffic.message = Some(message.clone());
            }
            BridgeNotification::PumpExited(exit) => {
                debug!(pump = %exit.label, "pump exit reported: {}", exit.reason);
            }
            BridgeNotification::NetworkLink { connected: false, .. } => {
                // A new peer starts with a clean traffic record.
                *self.traffic.lock().unwrap_or_else(PoisonError::into_inner) = TrafficState::default();
            }
            _ => {}
        }

        if let Some((signal, value)) = notification.signal_transition() {
            if !self.signals.set_signal(signal, value) {
                debug!(%signal, value, "signal already at value; re-evaluating anyway");
            }
        }

        self.evaluate().await
    }

    /// Converges the session on the current gate.  Used by the heartbeat.
    pub async fn evaluate(&self) -> TransitionOutcome {
        let mut session = self.session.lock().await;
        let outcome = if self.closed.load(Ordering::Acquire) {
            self.stop_session(&mut session).await
        } else {
            self.converge(&mut session).await
        };
        self.publish_status(&session);
        outcome
    }

    /// Stops any session and refuses to start new ones from now on.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let mut session = self.session.lock().await;
        if self.stop_session(&mut session).await == TransitionOutcome::Stopped {
            info!("relay stopped for shutdown");
        }
        self.publish_status(&session);
    }

    pub fn signals(&self) -> SignalSnapshot {
        self.signals.snapshot()
    }

    /// The latest published status.
    pub fn status(&self) -> BridgeStatus {
        self.status_tx.borrow().clone()
    }

    /// Receiver that observes every published status change.
    pub fn subscribe_status(&self) -> watch::Receiver<BridgeStatus> {
        self.status_tx.subscribe()
    }

    /// `true` while a session exists.
    pub async fn is_running(&self) -> bool {
        self.session.lock().await.is_some()
    }

    pub async fn running_pumps(&self) -> usize {
        self.session
            .lock()
            .await
            .as_ref()
            .map_or(0, RelaySession::running_pumps)
    }

    async fn converge(&self, session: &mut Option<RelaySession>) -> TransitionOutcome {
        let state = session.as_ref().map_or(SessionState::Stopped, RelaySession::state);
        let gate = self.signals.current_gate();

        match plan(state, gate) {
            TransitionPlan::Hold => TransitionOutcome::Unchanged,
            TransitionPlan::Start => self.start_session(session).await,
            TransitionPlan::Stop => self.stop_session(session).await,
            TransitionPlan::Restart => {
                info!("relay session went stale; restarting");
                self.stop_session(session).await;
                // Tearing down can take up to the cleanup timeout; the gate
                // may have closed meanwhile.
                if self.signals.current_gate() {
                    self.start_session(session).await
                } else {
                    TransitionOutcome::Stopped
                }
            }
        }
    }

    async fn start_session(&self, session: &mut Option<RelaySession>) -> TransitionOutcome {
        let Some(device) = self.device.acquire_stream_pair().await else {
            return self.abandon(self.device.name());
        };
        let Some(network) = self.network.acquire_stream_pair().await else {
            drop(device);
            self.device.release_stream_pair().await;
            return self.abandon(self.network.name());
        };

        let started = RelaySession::start(device, network, self.settings.chunk_size, self.notifier.clone());
        let id = started.id();
        *session = Some(started);
        TransitionOutcome::Started(id)
    }

    fn abandon(&self, transport: &str) -> TransitionOutcome {
        let err = StartError::TransportUnavailable {
            transport: transport.to_string(),
        };
        warn!("relay start abandoned: {err}");
        TransitionOutcome::Abandoned(err)
    }

    async fn stop_session(&self, session: &mut Option<RelaySession>) -> TransitionOutcome {
        let Some(mut running) = session.take() else {
            return TransitionOutcome::Unchanged;
        };
        running.cleanup(self.settings.cleanup_timeout).await;
        self.device.release_stream_pair().await;
        self.network.release_stream_pair().await;
        TransitionOutcome::Stopped
    }

    fn publish_status(&self, session: &Option<RelaySession>) {
        let (slow, message) = {
            let traffic = self.traffic.lock().unwrap_or_else(PoisonError::into_inner);
            (traffic.slow, traffic.message.clone())
        };
        let status = BridgeStatus::project(
            self.signals.snapshot(),
            slow,
            message,
            session.as_ref().map(RelaySession::id),
            session.as_ref().map_or(0, RelaySession::running_pumps),
        );
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("device", &self.device.name())
            .field("network", &self.network.name())
            .field("signals", &self.signals.snapshot())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
