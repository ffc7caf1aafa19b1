//! Application layer for wsbridge.
//!
//! Knows *when* bytes should flow and *which* streams to connect, but not
//! where the streams come from.
//!
//! # Responsibilities
//!
//! - The [`Transport`] seam both sides of the bridge implement
//! - Relay pumps and the session that pairs them
//! - The orchestrator that keeps the session consistent with the gate
//! - The event loop that serialises notifications and heartbeat ticks
//!
//! # What does NOT belong here?
//!
//! - Sockets, files, WebSocket framing (that is infrastructure)
//! - CLI or config file parsing (that is `main.rs` and infrastructure)

pub mod intake;
pub mod orchestrator;
pub mod relay_pump;
pub mod relay_session;
pub mod runtime;
pub mod transport;

pub use intake::{notification_channel, BridgeNotifier, NotificationIntake};
pub use orchestrator::{Orchestrator, StartError, TransitionOutcome};
pub use relay_pump::RelayPump;
pub use relay_session::RelaySession;
pub use runtime::BridgeRuntime;
pub use transport::{BoxedSink, BoxedSource, StreamPair, Transport};
