//! wsbridge library crate.
//!
//! Relays raw bytes between a locally attached device and a single WebSocket
//! peer, but only while the device is attached, its companion link is up and
//! a peer is connected.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Device (/dev/ttyGS0)                 WebSocket peer (:9007)
//!         ↕                                    ↕
//! [wsbridge]
//!   ├── domain/           BridgeConfig and its defaults
//!   ├── application/      Orchestrator, relay pumps, event loop
//!   └── infrastructure/
//!         ├── device_transport/  Polls and opens the character device
//!         ├── ws_transport/      WebSocket listener (tokio-tungstenite)
//!         ├── config_file/       Optional TOML config
//!         └── status_log/        Logs health changes
//! ```
//!
//! The signal registry, gate, transition table and status types live in the
//! `wsbridge-core` crate.
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain`, `wsbridge-core` and tokio primitives.
//! - `infrastructure` depends on all other layers plus sockets and files.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: orchestration and relaying.
pub mod application;

/// Infrastructure layer: concrete transports, config file, status logging.
pub mod infrastructure;
