//! Domain layer for wsbridge.
//!
//! Only configuration lives here; the connectivity rules themselves are in
//! the `wsbridge-core` crate so they can be shared and tested without tokio.
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, file or socket types
//! - Environment variable or CLI reading

pub mod config;

pub use config::{BridgeConfig, CompanionProbe, RelaySettings, MAX_CHUNK_SIZE};
