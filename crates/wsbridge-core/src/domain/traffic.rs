//! Slow-traffic tracking for the network side.
//!
//! The network transport times each outbound frame and feeds the duration to
//! a [`TrafficMonitor`].  The monitor only reports *changes* (fast → slow and
//! slow → fast), using the same compare-and-set discipline as the signal
//! registry so a burst of slow sends yields a single notification.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A change in traffic quality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrafficShift {
    BecameSlow { message: String },
    Recovered { message: String },
}

impl TrafficShift {
    pub fn is_slow(&self) -> bool {
        matches!(self, TrafficShift::BecameSlow { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            TrafficShift::BecameSlow { message } | TrafficShift::Recovered { message } => message,
        }
    }
}

/// Tracks whether outbound sends are currently slower than a threshold.
#[derive(Debug)]
pub struct TrafficMonitor {
    threshold: Duration,
    slow: AtomicBool,
}

impl TrafficMonitor {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            slow: AtomicBool::new(false),
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn is_slow(&self) -> bool {
        self.slow.load(Ordering::Acquire)
    }

    /// Records one send duration.  Returns a shift only when the slow flag flips.
    pub fn observe(&self, elapsed: Duration) -> Option<TrafficShift> {
        let slow_now = elapsed > self.threshold;
        let flipped = self
            .slow
            .compare_exchange(!slow_now, slow_now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !flipped {
            return None;
        }
        let millis = elapsed.as_millis();
        Some(if slow_now {
            TrafficShift::BecameSlow {
                message: format!("send took {millis} ms"),
            }
        } else {
            TrafficShift::Recovered {
                message: format!("send took {millis} ms"),
            }
        })
    }

    /// Forgets any slow state, e.g. when the peer disconnects.
    pub fn reset(&self) {
        self.slow.store(false, Ordering::Release);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
