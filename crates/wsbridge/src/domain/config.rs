//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is assembled once at startup from CLI arguments, environment variables
//! and the optional TOML file (see `infrastructure::config_file`), in that
//! order of precedence, and then handed by value to each service.
//!
//! Keeping configuration as a plain struct with no environment reads inside
//! the domain makes the bridge easy to embed in tests.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// How the device transport decides whether the companion link is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanionProbe {
    /// The companion link is considered established whenever the device is attached.
    FollowDevice,
    /// The companion link is established while this marker path exists.
    Marker(PathBuf),
}

impl CompanionProbe {
    /// Parses the CLI / config file spelling: `follow-device` or a path.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "follow-device" => CompanionProbe::FollowDevice,
            path => CompanionProbe::Marker(PathBuf::from(path)),
        }
    }
}

/// Largest accepted relay chunk size (1 MiB).
pub const MAX_CHUNK_SIZE: usize = 1 << 20;

/// Tunables for relay pumps and session teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    /// Maximum bytes moved per read/write cycle.
    pub chunk_size: usize,
    /// Upper bound on how long cleanup waits for a pump task to finish.
    pub cleanup_timeout: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            chunk_size: 8192,
            cleanup_timeout: Duration::from_secs(2),
        }
    }
}

/// All runtime configuration for the bridge.
///
/// # Example
///
/// ```rust
/// use wsbridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.ws_bind_addr.port(), 9007);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the WebSocket listener binds to.
    pub ws_bind_addr: SocketAddr,

    /// Character device backing the device transport.
    ///
    /// `/dev/ttyGS0` is the serial function exposed by a Linux USB gadget,
    /// which is how an accessory-style host sees the attached device.
    pub device_path: PathBuf,

    pub companion_probe: CompanionProbe,

    /// How often the device watcher checks for attachment changes.
    pub device_poll_interval: Duration,

    /// Interval of the re-evaluation heartbeat.
    pub heartbeat_interval: Duration,

    /// A WebSocket send slower than this marks the network as slow.
    pub slow_send_threshold: Duration,

    pub relay: RelaySettings,
}

impl Default for BridgeConfig {
    /// | Field                | Default          |
    /// |----------------------|------------------|
    /// | ws_bind_addr         | `0.0.0.0:9007`   |
    /// | device_path          | `/dev/ttyGS0`    |
    /// | companion_probe      | follow device    |
    /// | device_poll_interval | 500 ms           |
    /// | heartbeat_interval   | 2 seconds        |
    /// | slow_send_threshold  | 250 ms           |
    /// | relay.chunk_size     | 8192 bytes       |
    /// | relay.cleanup_timeout| 2 seconds        |
    fn default() -> Self {
        Self {
            // Compile-time constant, always parses.
            ws_bind_addr: "0.0.0.0:9007".parse().unwrap(),
            device_path: PathBuf::from("/dev/ttyGS0"),
            companion_probe: CompanionProbe::FollowDevice,
            device_poll_interval: Duration::from_millis(500),
            heartbeat_interval: Duration::from_secs(2),
            slow_send_threshold: Duration::from_millis(250),
            relay: RelaySettings::default(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ws_port_is_9007() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.ws_bind_addr.port(), 9007);
        assert!(cfg.ws_bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_default_heartbeat_is_two_seconds() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_default_device_path() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.device_path, PathBuf::from("/dev/ttyGS0"));
        assert_eq!(cfg.companion_probe, CompanionProbe::FollowDevice);
    }

    #[test]
    fn test_default_relay_settings() {
        let relay = RelaySettings::default();
        assert_eq!(relay.chunk_size, 8192);
        assert_eq!(relay.cleanup_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_companion_probe_parse_follow_device() {
        assert_eq!(CompanionProbe::parse("follow-device"), CompanionProbe::FollowDevice);
        assert_eq!(CompanionProbe::parse("  "), CompanionProbe::FollowDevice);
    }

    #[test]
    fn test_companion_probe_parse_marker_path() {
        assert_eq!(
            CompanionProbe::parse("/run/wsbridge/rc-linked"),
            CompanionProbe::Marker(PathBuf::from("/run/wsbridge/rc-linked"))
        );
    }
}
