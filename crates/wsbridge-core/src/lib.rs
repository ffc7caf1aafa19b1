//! # wsbridge-core
//!
//! Shared domain library for the device-to-network bridge.
//!
//! The bridge forwards bytes between a locally attached device (a serial or
//! accessory-style duplex stream) and a single network peer, but only while
//! every connectivity precondition holds.  This crate contains the pure rules
//! that decide *when* relaying is allowed.  It has no dependency on an async
//! runtime, sockets or the file system.
//!
//! # Architecture overview
//!
//! ```text
//! connectivity notifications
//!         │
//!         ▼
//!   SignalRegistry ──► current_gate() ──► transition::plan() ──► Start / Stop / Restart / Hold
//!         │
//!         ▼
//!   BridgeStatus (projection for logging and presentation)
//! ```
//!
//! - **`domain::signals`** – the three connectivity signals and their
//!   compare-and-set registry.
//! - **`domain::notification`** – the typed notifications delivered to the
//!   orchestrator's intake.
//! - **`domain::transition`** – the pure gate-to-session decision table.
//! - **`domain::status`** – read-only status snapshots and link health.
//! - **`domain::traffic`** – slow-traffic tracking for the network side.

pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `wsbridge_core::SignalRegistry` instead of the full module path.
pub use domain::notification::{BridgeNotification, PumpExit, PumpExitReason};
pub use domain::signals::{Signal, SignalRegistry, SignalSnapshot};
pub use domain::status::{BridgeStatus, LinkHealth};
pub use domain::traffic::{TrafficMonitor, TrafficShift};
pub use domain::transition::{plan, SessionState, TransitionPlan};
