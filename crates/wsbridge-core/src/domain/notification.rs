//! Typed notifications delivered to the orchestrator's intake.
//!
//! Collaborators (the device transport, the network transport and the relay
//! pumps themselves) never touch the signal registry directly.  They describe
//! what they observed with a [`BridgeNotification`] and the orchestrator's
//! single intake decides what it means.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::signals::Signal;

/// Why a relay pump stopped on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PumpExitReason {
    /// The source stream reported end-of-input.
    EndOfInput { bytes_relayed: u64 },
    /// A read from the source or a write to the sink failed.
    IoFailure { message: String },
}

impl fmt::Display for PumpExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PumpExitReason::EndOfInput { bytes_relayed } => {
                write!(f, "end of input after {bytes_relayed} bytes")
            }
            PumpExitReason::IoFailure { message } => write!(f, "I/O failure: {message}"),
        }
    }
}

/// Report emitted by a pump that terminated without being asked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpExit {
    /// Direction label of the pump, e.g. `"device->network"`.
    pub label: String,
    pub reason: PumpExitReason,
}

/// A connectivity or liveness event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeNotification {
    /// The device transport was attached or detached.
    DeviceLink { connected: bool },
    /// The device's companion link came up or went down.
    CompanionLink { connected: bool },
    /// A network peer connected or disconnected.
    NetworkLink {
        connected: bool,
        peer: Option<String>,
    },
    /// The network side became slow or recovered.  Status only; never gates.
    TrafficQuality { slow: bool, message: String },
    /// A relay pump died on its own (EOF or I/O failure).
    PumpExited(PumpExit),
}

impl BridgeNotification {
    /// The signal transition this notification requests, if any.
    pub fn signal_transition(&self) -> Option<(Signal, bool)> {
        match self {
            BridgeNotification::DeviceLink { connected } => {
                Some((Signal::DeviceAttached, *connected))
            }
            BridgeNotification::CompanionLink { connected } => {
                Some((Signal::CompanionLinked, *connected))
            }
            BridgeNotification::NetworkLink { connected, .. } => {
                Some((Signal::NetworkConnected, *connected))
            }
            BridgeNotification::TrafficQuality { .. } | BridgeNotification::PumpExited(_) => None,
        }
    }

    /// Short variant name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeNotification::DeviceLink { .. } => "DeviceLink",
            BridgeNotification::CompanionLink { .. } => "CompanionLink",
            BridgeNotification::NetworkLink { .. } => "NetworkLink",
            BridgeNotification::TrafficQuality { .. } => "TrafficQuality",
            BridgeNotification::PumpExited(_) => "PumpExited",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_notifications_map_to_their_signals() {
        assert_eq!(
            BridgeNotification::DeviceLink { connected: true }.signal_transition(),
            Some((Signal::DeviceAttached, true))
        );
        assert_eq!(
            BridgeNotification::CompanionLink { connected: false }.signal_transition(),
            Some((Signal::CompanionLinked, false))
        );
        assert_eq!(
            BridgeNotification::NetworkLink {
                connected: true,
                peer: Some("10.0.0.7:51234".to_string()),
            }
            .signal_transition(),
            Some((Signal::NetworkConnected, true))
        );
    }

    #[test]
    fn test_traffic_quality_does_not_touch_signals() {
        let n = BridgeNotification::TrafficQuality {
            slow: true,
            message: "send took 900 ms".to_string(),
        };
        assert_eq!(n.signal_transition(), None);
    }

    #[test]
    fn test_pump_exit_does_not_touch_signals() {
        let n = BridgeNotification::PumpExited(PumpExit {
            label: "device->network".to_string(),
            reason: PumpExitReason::EndOfInput { bytes_relayed: 12 },
        });
        assert_eq!(n.signal_transition(), None);
        assert_eq!(n.kind(), "PumpExited");
    }

    #[test]
    fn test_exit_reason_display() {
        let eof = PumpExitReason::EndOfInput { bytes_relayed: 3 };
        assert_eq!(eof.to_string(), "end of input after 3 bytes");

        let io = PumpExitReason::IoFailure {
            message: "broken pipe".to_string(),
        };
        assert_eq!(io.to_string(), "I/O failure: broken pipe");
    }
}
