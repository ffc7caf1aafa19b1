//! Infrastructure layer for wsbridge.
//!
//! Handles all I/O: the WebSocket listener, the character device, the config
//! file and status logging.
//!
//! # Responsibilities
//!
//! - Accepting the WebSocket peer and lending it as a byte stream
//! - Watching for and opening the device node
//! - Reading the optional TOML config file
//! - Logging health changes
//!
//! # What does NOT belong here?
//!
//! - Deciding when the relay runs (that is the application layer)
//! - Signal and status types (those are in `wsbridge-core`)

pub mod config_file;
pub mod device_transport;
pub mod status_log;
pub mod ws_transport;

pub use config_file::{load_config, ConfigError, FileConfig};
pub use device_transport::DeviceTransport;
pub use status_log::spawn_status_logger;
pub use ws_transport::{run_server, WsTransport};
