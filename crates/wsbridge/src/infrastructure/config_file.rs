//! Optional TOML configuration file.
//!
//! Every field is optional.  Whatever the file sets overrides the built-in
//! defaults, and whatever the command line sets overrides the file (see
//! `main.rs`).
//!
//! ```toml
//! log_level = "debug"
//!
//! [network]
//! bind_address = "0.0.0.0:9007"
//! slow_send_threshold_ms = 250
//!
//! [device]
//! path = "/dev/ttyGS0"
//! companion = "follow-device"   # or a marker path
//! poll_interval_ms = 500
//!
//! [relay]
//! chunk_size = 8192
//! cleanup_timeout_ms = 2000
//! heartbeat_interval_ms = 2000
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{BridgeConfig, CompanionProbe, MAX_CHUNK_SIZE};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed as TOML but holds an unusable value.
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

/// Contents of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileConfig {
    /// `tracing` filter directive, e.g. `"info"` or `"wsbridge=debug"`.
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub relay: RelaySection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkSection {
    #[serde(default)]
    pub bind_address: Option<String>,
    #[serde(default)]
    pub slow_send_threshold_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSection {
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// `"follow-device"` or a marker file path.
    #[serde(default)]
    pub companion: Option<String>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelaySection {
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub cleanup_timeout_ms: Option<u64>,
    #[serde(default)]
    pub heartbeat_interval_ms: Option<u64>,
}

impl FileConfig {
    /// Overwrites the fields of `config` that this file sets.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unparsable bind address or
    /// a chunk size outside `1..=MAX_CHUNK_SIZE`.
    pub fn apply_to(&self, config: &mut BridgeConfig) -> Result<(), ConfigError> {
        if let Some(addr) = &self.network.bind_address {
            config.ws_bind_addr = parse_bind_address(addr)?;
        }
        if let Some(ms) = self.network.slow_send_threshold_ms {
            config.slow_send_threshold = Duration::from_millis(ms);
        }
        if let Some(path) = &self.device.path {
            config.device_path = path.clone();
        }
        if let Some(probe) = &self.device.companion {
            config.companion_probe = CompanionProbe::parse(probe);
        }
        if let Some(ms) = self.device.poll_interval_ms {
            config.device_poll_interval = Duration::from_millis(ms);
        }
        if let Some(size) = self.relay.chunk_size {
            if size == 0 || size > MAX_CHUNK_SIZE {
                return Err(ConfigError::InvalidValue {
                    field: "relay.chunk_size",
                    value: size.to_string(),
                });
            }
            config.relay.chunk_size = size;
        }
        if let Some(ms) = self.relay.cleanup_timeout_ms {
            config.relay.cleanup_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.relay.heartbeat_interval_ms {
            config.heartbeat_interval = Duration::from_millis(ms);
        }
        Ok(())
    }
}

/// Parses a bind address for `network.bind_address`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if `raw` is not `ip:port`.
pub fn parse_bind_address(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        field: "network.bind_address",
        value: raw.to_string(),
    })
}

/// Loads and parses the file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist; the path was asked for explicitly) and
/// [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        log_level = "debug"

        [network]
        bind_address = "127.0.0.1:9100"
        slow_send_threshold_ms = 100

        [device]
        path = "/dev/ttyACM0"
        companion = "/run/companion.up"
        poll_interval_ms = 250

        [relay]
        chunk_size = 4096
        cleanup_timeout_ms = 500
        heartbeat_interval_ms = 1000
    "#;

    #[test]
    fn test_empty_file_changes_nothing() {
        // Arrange
        let file: FileConfig = toml::from_str("").unwrap();
        let mut cfg = BridgeConfig::default();

        // Act
        file.apply_to(&mut cfg).unwrap();

        // Assert
        assert_eq!(file, FileConfig::default());
        assert_eq!(cfg.ws_bind_addr, BridgeConfig::default().ws_bind_addr);
        assert_eq!(cfg.relay, BridgeConfig::default().relay);
    }

    #[test]
    fn test_full_file_overrides_every_field() {
        // Arrange
        let file: FileConfig = toml::from_str(FULL).unwrap();
        let mut cfg = BridgeConfig::default();

        // Act
        file.apply_to(&mut cfg).unwrap();

        // Assert
        assert_eq!(file.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.ws_bind_addr.to_string(), "127.0.0.1:9100");
        assert_eq!(cfg.slow_send_threshold, Duration::from_millis(100));
        assert_eq!(cfg.device_path, PathBuf::from("/dev/ttyACM0"));
        assert_eq!(
            cfg.companion_probe,
            CompanionProbe::Marker(PathBuf::from("/run/companion.up"))
        );
        assert_eq!(cfg.device_poll_interval, Duration::from_millis(250));
        assert_eq!(cfg.relay.chunk_size, 4096);
        assert_eq!(cfg.relay.cleanup_timeout, Duration::from_millis(500));
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let file: FileConfig = toml::from_str("[relay]\nchunk_size = 512\n").unwrap();
        let mut cfg = BridgeConfig::default();

        file.apply_to(&mut cfg).unwrap();

        assert_eq!(cfg.relay.chunk_size, 512);
        assert_eq!(cfg.relay.cleanup_timeout, Duration::from_secs(2));
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_bad_bind_address_is_rejected() {
        let file: FileConfig = toml::from_str("[network]\nbind_address = \"nowhere\"\n").unwrap();
        let mut cfg = BridgeConfig::default();

        let err = file.apply_to(&mut cfg).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { field: "network.bind_address", .. }));
    }

    #[test]
    fn test_oversized_chunk_size_is_rejected() {
        let file: FileConfig = toml::from_str("[relay]\nchunk_size = 1048577\n").unwrap();
        let mut cfg = BridgeConfig::default();

        let err = file.apply_to(&mut cfg).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { field: "relay.chunk_size", .. }));
        assert_eq!(cfg.relay.chunk_size, 8192);
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let file: FileConfig = toml::from_str("[relay]\nchunk_size = 0\n").unwrap();
        let mut cfg = BridgeConfig::default();

        assert!(file.apply_to(&mut cfg).is_err());
        assert_eq!(cfg.relay.chunk_size, 8192);
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let path = std::env::temp_dir().join(format!("wsbridge-bad-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[relay\nchunk_size = ").unwrap();

        let result = load_config(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = PathBuf::from("/nonexistent/wsbridge/config.toml");

        let result = load_config(&path);

        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_config_reads_file() {
        let path = std::env::temp_dir().join(format!("wsbridge-ok-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, FULL).unwrap();

        let result = load_config(&path);
        let _ = std::fs::remove_file(&path);

        let file = result.unwrap();
        assert_eq!(file.relay.chunk_size, Some(4096));
        assert_eq!(file.device.companion.as_deref(), Some("/run/companion.up"));
    }
}
