//! Read-only status snapshots.
//!
//! [`BridgeStatus`] is what presentation layers (logs, a status screen, a
//! JSON endpoint) consume.  It is always rebuilt from the live state and never
//! fed back into any decision.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::signals::SignalSnapshot;

/// Traffic-light health of one side of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkHealth {
    Good,
    Warning,
    Bad,
}

impl LinkHealth {
    /// Device side: both device and companion up is `Good`, exactly one is a
    /// `Warning`, neither is `Bad`.
    pub fn device(device_attached: bool, companion_linked: bool) -> Self {
        match (device_attached, companion_linked) {
            (true, true) => LinkHealth::Good,
            (false, false) => LinkHealth::Bad,
            _ => LinkHealth::Warning,
        }
    }

    /// Network side: no peer is `Bad`, a slow peer is a `Warning`.
    pub fn network(network_connected: bool, traffic_slow: bool) -> Self {
        match (network_connected, traffic_slow) {
            (false, _) => LinkHealth::Bad,
            (true, true) => LinkHealth::Warning,
            (true, false) => LinkHealth::Good,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LinkHealth::Good => "good",
            LinkHealth::Warning => "warning",
            LinkHealth::Bad => "bad",
        }
    }
}

/// Snapshot of everything a status view needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub signals: SignalSnapshot,
    pub traffic_slow: bool,
    /// Last traffic-quality message from the network transport.
    pub traffic_message: Option<String>,
    /// Whether a relay session currently exists.
    pub relay_active: bool,
    /// Number of pumps still running inside the session (0, 1 or 2).
    pub running_pumps: usize,
    pub session_id: Option<Uuid>,
    pub device_health: LinkHealth,
    pub network_health: LinkHealth,
}

impl BridgeStatus {
    /// Builds a snapshot and derives both health values.
    pub fn project(
        signals: SignalSnapshot,
        traffic_slow: bool,
        traffic_message: Option<String>,
        session_id: Option<Uuid>,
        running_pumps: usize,
    ) -> Self {
        Self {
            signals,
            traffic_slow,
            traffic_message,
            relay_active: session_id.is_some(),
            running_pumps,
            session_id,
            device_health: LinkHealth::device(signals.device_attached, signals.companion_linked),
            network_health: LinkHealth::network(signals.network_connected, traffic_slow),
        }
    }

    /// `true` when the gate is open and a fully running session exists.
    pub fn is_relaying(&self) -> bool {
        self.signals.gate() && self.relay_active && self.running_pumps == 2
    }
}

impl Default for BridgeStatus {
    fn default() -> Self {
        Self::project(SignalSnapshot::default(), false, None, None, 0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_health_matrix() {
        assert_eq!(LinkHealth::device(true, true), LinkHealth::Good);
        assert_eq!(LinkHealth::device(true, false), LinkHealth::Warning);
        assert_eq!(LinkHealth::device(false, true), LinkHealth::Warning);
        assert_eq!(LinkHealth::device(false, false), LinkHealth::Bad);
    }

    #[test]
    fn test_network_health_matrix() {
        assert_eq!(LinkHealth::network(true, false), LinkHealth::Good);
        assert_eq!(LinkHealth::network(true, true), LinkHealth::Warning);
        assert_eq!(LinkHealth::network(false, false), LinkHealth::Bad);
        assert_eq!(LinkHealth::network(false, true), LinkHealth::Bad);
    }

    #[test]
    fn test_default_status_is_idle_and_bad() {
        let status = BridgeStatus::default();
        assert!(!status.relay_active);
        assert_eq!(status.running_pumps, 0);
        assert_eq!(status.device_health, LinkHealth::Bad);
        assert_eq!(status.network_health, LinkHealth::Bad);
        assert!(!status.is_relaying());
    }

    #[test]
    fn test_project_marks_session_active() {
        // Arrange
        let signals = SignalSnapshot {
            device_attached: true,
            companion_linked: true,
            network_connected: true,
        };
        let id = Uuid::new_v4();

        // Act
        let status = BridgeStatus::project(signals, false, None, Some(id), 2);

        // Assert
        assert!(status.relay_active);
        assert!(status.is_relaying());
        assert_eq!(status.session_id, Some(id));
        assert_eq!(status.device_health, LinkHealth::Good);
        assert_eq!(status.network_health, LinkHealth::Good);
    }

    #[test]
    fn test_half_running_session_is_not_relaying() {
        let signals = SignalSnapshot {
            device_attached: true,
            companion_linked: true,
            network_connected: true,
        };
        let status = BridgeStatus::project(signals, false, None, Some(Uuid::new_v4()), 1);
        assert!(status.relay_active);
        assert!(!status.is_relaying());
    }

    #[test]
    fn test_status_serializes_health_in_snake_case() {
        let json = serde_json::to_value(BridgeStatus::default()).unwrap();
        assert_eq!(json["device_health"], "bad");
        assert_eq!(json["network_health"], "bad");
        assert_eq!(json["relay_active"], false);
    }
}
