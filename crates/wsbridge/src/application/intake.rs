//! Notification channel between collaborators and the orchestrator.
//!
//! Collaborators hold a cloneable [`BridgeNotifier`]; the event loop owns the
//! single [`NotificationIntake`].  A bounded channel keeps a misbehaving
//! collaborator from growing memory without limit.

use tokio::sync::mpsc;
use tracing::debug;

use wsbridge_core::BridgeNotification;

/// Sending side handed to transports and relay pumps.
#[derive(Debug, Clone)]
pub struct BridgeNotifier {
    tx: mpsc::Sender<BridgeNotification>,
}

/// Receiving side owned by the event loop.
#[derive(Debug)]
pub struct NotificationIntake {
    rx: mpsc::Receiver<BridgeNotification>,
}

/// Creates a connected notifier/intake pair.
pub fn notification_channel(capacity: usize) -> (BridgeNotifier, NotificationIntake) {
    let (tx, rx) = mpsc::channel(capacity);
    (BridgeNotifier { tx }, NotificationIntake { rx })
}

impl BridgeNotifier {
    /// Delivers a notification, waiting for room in the channel.
    ///
    /// A closed intake means the bridge is shutting down, so the notification
    /// is dropped.
    pub async fn notify(&self, notification: BridgeNotification) {
        let kind = notification.kind();
        if self.tx.send(notification).await.is_err() {
            debug!(kind, "intake closed; notification dropped");
        }
    }

    /// Delivers a notification without waiting.
    ///
    /// Returns `false` when the channel is full or closed.  Callers that use
    /// this rely on the heartbeat to pick up the state change instead.
    pub fn try_notify(&self, notification: BridgeNotification) -> bool {
        let kind = notification.kind();
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(e) => {
                debug!(kind, "notification not queued: {e}");
                false
            }
        }
    }
}

impl NotificationIntake {
    /// Waits for the next notification.  `None` once every notifier is gone.
    pub async fn recv(&mut self) -> Option<BridgeNotification> {
        self.rx.recv().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
