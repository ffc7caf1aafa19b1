//! Connectivity signals and the compare-and-set registry that owns them.
//!
//! The bridge tracks three independent facts:
//!
//! | Signal             | Meaning                                          |
//! |--------------------|--------------------------------------------------|
//! | `DeviceAttached`   | the local device transport is attached           |
//! | `CompanionLinked`  | the device reports its companion link is up      |
//! | `NetworkConnected` | a network peer is connected to the bridge        |
//!
//! The *gate* is the conjunction of all three.  Relaying is only permitted
//! while the gate is open.
//!
//! # Why compare-and-set?
//!
//! Notifications arrive from several tasks and may repeat a state that is
//! already stored.  [`SignalRegistry::set_signal`] performs a single atomic
//! compare-and-set and tells the caller whether the value actually flipped,
//! so duplicate transitions are suppressed in one place instead of every
//! caller doing its own read-modify-write.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One of the three connectivity signals that make up the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// The local device transport is attached.
    DeviceAttached,
    /// The device's companion link (e.g. a paired remote controller) is established.
    CompanionLinked,
    /// A network peer is connected.
    NetworkConnected,
}

impl Signal {
    /// All signals, in gate evaluation order.
    pub const ALL: [Signal; 3] = [
        Signal::DeviceAttached,
        Signal::CompanionLinked,
        Signal::NetworkConnected,
    ];

    /// Short stable name used in log fields.
    pub fn name(self) -> &'static str {
        match self {
            Signal::DeviceAttached => "device",
            Signal::CompanionLinked => "companion",
            Signal::NetworkConnected => "network",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Point-in-time copy of all three signal values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub device_attached: bool,
    pub companion_linked: bool,
    pub network_connected: bool,
}

impl SignalSnapshot {
    /// Conjunction of the three values.
    pub fn gate(&self) -> bool {
        self.device_attached && self.companion_linked && self.network_connected
    }
}

/// Owner of the three connectivity signals.
///
/// Every signal starts `false`.  The only mutation path is
/// [`set_signal`](Self::set_signal); there is no `&mut` API and
/// no way to obtain the underlying atomics.
#[derive(Debug, Default)]
pub struct SignalRegistry {
    device_attached: AtomicBool,
    companion_linked: AtomicBool,
    network_connected: AtomicBool,
}

impl SignalRegistry {
    /// Creates a registry with every signal `false`.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, signal: Signal) -> &AtomicBool {
        match signal {
            Signal::DeviceAttached => &self.device_attached,
            Signal::CompanionLinked => &self.companion_linked,
            Signal::NetworkConnected => &self.network_connected,
        }
    }

    /// Requests a transition of `signal` to `value`.
    ///
    /// Always succeeds.  Returns `true` only when the stored value flipped;
    /// `false` means the signal already held `value`.  Reacting to the change
    /// (evaluating the gate, notifying observers) is the caller's job.
    pub fn set_signal(&self, signal: Signal, value: bool) -> bool {
        let changed = self
            .slot(signal)
            .compare_exchange(!value, value, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if changed {
            debug!(signal = signal.name(), value, "connectivity signal flipped");
        }
        changed
    }

    /// Returns the current value of a single signal.
    pub fn get(&self, signal: Signal) -> bool {
        self.slot(signal).load(Ordering::Acquire)
    }

    /// Returns the gate: `true` only when every signal is `true`.
    ///
    /// Recomputed from the atomics on every call.
    pub fn current_gate(&self) -> bool {
        Signal::ALL.iter().all(|s| self.get(*s))
    }

    /// Copies all three values.
    pub fn snapshot(&self) -> SignalSnapshot {
        SignalSnapshot {
            device_attached: self.get(Signal::DeviceAttached),
            companion_linked: self.get(Signal::CompanionLinked),
            network_connected: self.get(Signal::NetworkConnected),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
