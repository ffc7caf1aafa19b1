//! Logs bridge health as it changes.
//!
//! Subscribes to the orchestrator's status channel and writes one `info!`
//! line per change of device health, network health or relay state, plus the
//! full snapshot as JSON at `debug`.  It only reads status.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use wsbridge_core::BridgeStatus;

/// Human-readable lines describing what differs between two snapshots.
pub fn describe_changes(previous: &BridgeStatus, current: &BridgeStatus) -> Vec<String> {
    let mut lines = Vec::new();
    if previous.device_health != current.device_health {
        lines.push(format!(
            "device health {} -> {} (attached={}, companion={})",
            previous.device_health.as_str(),
            current.device_health.as_str(),
            current.signals.device_attached,
            current.signals.companion_linked,
        ));
    }
    if previous.network_health != current.network_health {
        let mut line = format!(
            "network health {} -> {} (connected={})",
            previous.network_health.as_str(),
            current.network_health.as_str(),
            current.signals.network_connected,
        );
        if let Some(message) = current.traffic_message.as_deref().filter(|_| current.traffic_slow) {
            line.push_str(&format!(", {message}"));
        }
        lines.push(line);
    }
    if previous.session_id != current.session_id {
        lines.push(match current.session_id {
            Some(id) => format!("relay active (session {id})"),
            None => "relay inactive".to_string(),
        });
    }
    lines
}

/// Spawns the logger.  It ends when the status sender is dropped.
pub fn spawn_status_logger(mut rx: watch::Receiver<BridgeStatus>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut previous = rx.borrow_and_update().clone();
        while rx.changed().await.is_ok() {
            let current = rx.borrow_and_update().clone();
            for line in describe_changes(&previous, &current) {
                info!("{line}");
            }
            match serde_json::to_string(&current) {
                Ok(json) => debug!(status = %json, "status updated"),
                Err(e) => debug!("status not serialisable: {e}"),
            }
            previous = current;
        }
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use wsbridge_core::SignalSnapshot;

    fn status(device: bool, companion: bool, network: bool, slow: bool, session: Option<Uuid>) -> BridgeStatus {
        BridgeStatus::project(
            SignalSnapshot {
                device_attached: device,
                companion_linked: companion,
                network_connected: network,
            },
            slow,
            slow.then(|| "send took 400 ms".to_string()),
            session,
            if session.is_some() { 2 } else { 0 },
        )
    }

    #[test]
    fn test_identical_snapshots_produce_no_lines() {
        let s = status(true, true, true, false, None);
        assert!(describe_changes(&s, &s.clone()).is_empty());
    }

    #[test]
    fn test_device_health_change_is_described() {
        let lines = describe_changes(&status(false, false, false, false, None), &status(true, false, false, false, None));

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("device health bad -> warning"));
    }

    #[test]
    fn test_slow_network_line_carries_traffic_message() {
        let lines = describe_changes(&status(true, true, true, false, None), &status(true, true, true, true, None));

        assert_eq!(lines, vec!["network health good -> warning (connected=true), send took 400 ms".to_string()]);
    }

    #[test]
    fn test_relay_start_and_stop_are_described() {
        let id = Uuid::new_v4();
        let idle = status(true, true, true, false, None);
        let active = status(true, true, true, false, Some(id));

        assert_eq!(describe_changes(&idle, &active), vec![format!("relay active (session {id})")]);
        assert_eq!(describe_changes(&active, &idle), vec!["relay inactive".to_string()]);
    }

    #[tokio::test]
    async fn test_logger_ends_when_sender_dropped() {
        let (tx, rx) = watch::channel(BridgeStatus::default());
        let logger = spawn_status_logger(rx);

        tx.send_replace(status(true, true, false, false, None));
        drop(tx);

        tokio::time::timeout(std::time::Duration::from_secs(1), logger)
            .await
            .unwrap()
            .unwrap();
    }
}
