//! A bidirectional relay: two pumps created, started and destroyed together.

use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use wsbridge_core::SessionState;

use super::intake::BridgeNotifier;
use super::relay_pump::RelayPump;
use super::transport::StreamPair;

/// Direction label of the pump reading from the device.
pub const DEVICE_TO_NETWORK: &str = "device->network";
/// Direction label of the pump reading from the network peer.
pub const NETWORK_TO_DEVICE: &str = "network->device";

/// The paired pumps that bridge one device stream pair to one network stream pair.
///
/// There is no way to build a session with a single pump, and `cleanup`
/// always tears down both.
#[derive(Debug)]
pub struct RelaySession {
    id: Uuid,
    device_to_network: RelayPump,
    network_to_device: RelayPump,
}

impl RelaySession {
    /// Builds both pumps from the two lent stream pairs and starts them.
    pub fn start(
        device: StreamPair,
        network: StreamPair,
        chunk_size: usize,
        notifier: Option<BridgeNotifier>,
    ) -> Self {
        let mut device_to_network = RelayPump::new(
            device.source,
            network.sink,
            DEVICE_TO_NETWORK,
            chunk_size,
            notifier.clone(),
        );
        let mut network_to_device = RelayPump::new(
            network.source,
            device.sink,
            NETWORK_TO_DEVICE,
            chunk_size,
            notifier,
        );
        device_to_network.start();
        network_to_device.start();

        let id = Uuid::new_v4();
        info!(session = %id, "relay session started");
        Self {
            id,
            device_to_network,
            network_to_device,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of pumps whose copy loop is still live (0, 1 or 2).
    pub fn running_pumps(&self) -> usize {
        [&self.device_to_network, &self.network_to_device]
            .iter()
            .filter(|p| p.is_running())
            .count()
    }

    /// `Running` when both pumps are live, `Stale` otherwise.
    pub fn state(&self) -> SessionState {
        if self.running_pumps() == 2 {
            SessionState::Running
        } else {
            SessionState::Stale
        }
    }

    /// Stops both pumps.  Idempotent.
    pub async fn cleanup(&mut self, timeout: Duration) {
        // The two cleanups are independent; run them concurrently so a slow
        // one does not double the worst-case wait.
        tokio::join!(
            self.device_to_network.cleanup(timeout),
            self.network_to_device.cleanup(timeout),
        );
        info!(session = %self.id, "relay session stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
