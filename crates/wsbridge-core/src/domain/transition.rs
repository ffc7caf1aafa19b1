//! The gate-to-session decision table.
//!
//! The orchestrator calls [`plan`] on every evaluation pass, whether it was
//! triggered by a notification or by the heartbeat.  Keeping the table pure
//! means every row can be unit tested without tasks or streams.
//!
//! ```text
//!   session   gate    plan
//!   ───────   ─────   ───────
//!   Stopped   true    Start
//!   Stopped   false   Hold
//!   Running   true    Hold
//!   Running   false   Stop
//!   Stale     true    Restart
//!   Stale     false   Stop
//! ```

use serde::{Deserialize, Serialize};

/// What the orchestrator currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No relay session exists.
    Stopped,
    /// A session exists and both pumps are running.
    Running,
    /// A session exists but at least one pump terminated on its own.
    Stale,
}

/// Action the orchestrator must take to converge on the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionPlan {
    /// Already consistent with the gate.
    Hold,
    /// Acquire both stream pairs and start a session.
    Start,
    /// Tear the session down and release both stream pairs.
    Stop,
    /// Tear the stale session down, then start a fresh one.
    Restart,
}

/// Maps the current session state and gate value to a plan.
pub fn plan(state: SessionState, gate: bool) -> TransitionPlan {
    match (state, gate) {
        (SessionState::Stopped, true) => TransitionPlan::Start,
        (SessionState::Stopped, false) => TransitionPlan::Hold,
        (SessionState::Running, true) => TransitionPlan::Hold,
        (SessionState::Running, false) => TransitionPlan::Stop,
        (SessionState::Stale, true) => TransitionPlan::Restart,
        (SessionState::Stale, false) => TransitionPlan::Stop,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
