//! wsbridge: device-to-WebSocket byte relay, entry point.
//!
//! Relays raw bytes between a locally attached device (by default the USB
//! gadget serial port `/dev/ttyGS0`) and a single WebSocket peer.  Bytes flow
//! only while the device is attached, its companion link is up and a peer is
//! connected; the relay is torn down as soon as any of the three drops and
//! restarted when all three hold again.
//!
//! # Usage
//!
//! ```text
//! wsbridge [OPTIONS]
//!
//! Options:
//!   --config <PATH>             Optional TOML config file
//!   --ws-bind <ADDR>            WebSocket listen address [default: 0.0.0.0:9007]
//!   --device <PATH>             Device node [default: /dev/ttyGS0]
//!   --companion <PROBE>         `follow-device` or a marker path
//!   --device-poll-ms <MS>       Device poll interval [default: 500]
//!   --heartbeat-ms <MS>         Re-evaluation heartbeat [default: 2000]
//!   --slow-send-ms <MS>         Slow-traffic threshold [default: 250]
//!   --chunk-size <BYTES>        Relay chunk size [default: 8192]
//!   --cleanup-timeout-ms <MS>   Pump teardown bound [default: 2000]
//!   --log-level <FILTER>        tracing filter [default: info]
//! ```
//!
//! # Precedence
//!
//! Command line (or the matching `WSBRIDGE_*` environment variable) beats the
//! config file, which beats the built-in defaults.  `RUST_LOG`, when set,
//! replaces the log filter entirely.
//!
//! | Variable                      | Flag                   |
//! |-------------------------------|------------------------|
//! | `WSBRIDGE_CONFIG`             | `--config`             |
//! | `WSBRIDGE_WS_BIND`            | `--ws-bind`            |
//! | `WSBRIDGE_DEVICE`             | `--device`             |
//! | `WSBRIDGE_COMPANION`          | `--companion`          |
//! | `WSBRIDGE_DEVICE_POLL_MS`     | `--device-poll-ms`     |
//! | `WSBRIDGE_HEARTBEAT_MS`       | `--heartbeat-ms`       |
//! | `WSBRIDGE_SLOW_SEND_MS`       | `--slow-send-ms`       |
//! | `WSBRIDGE_CHUNK_SIZE`         | `--chunk-size`         |
//! | `WSBRIDGE_CLEANUP_TIMEOUT_MS` | `--cleanup-timeout-ms` |
//! | `WSBRIDGE_LOG_LEVEL`          | `--log-level`          |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wsbridge::application::{notification_channel, BridgeRuntime, Orchestrator};
use wsbridge::domain::{BridgeConfig, CompanionProbe, MAX_CHUNK_SIZE};
use wsbridge::infrastructure::{
    load_config, run_server, spawn_status_logger, DeviceTransport, FileConfig, WsTransport,
};

/// Room for bursts of link changes; pumps fall back to the heartbeat if full.
const NOTIFICATION_CAPACITY: usize = 64;

const DEFAULT_LOG_LEVEL: &str = "info";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Device-to-WebSocket byte relay, gated on device, companion and peer.
///
/// Every option is optional so that an unset flag falls through to the config
/// file and then to the built-in default.
#[derive(Debug, Default, Parser)]
#[command(name = "wsbridge", version)]
struct Cli {
    /// TOML config file.
    #[arg(long, env = "WSBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Address the WebSocket listener binds to, as `ip:port`.
    #[arg(long, env = "WSBRIDGE_WS_BIND")]
    ws_bind: Option<String>,

    /// Device node backing the device transport.
    #[arg(long, env = "WSBRIDGE_DEVICE")]
    device: Option<PathBuf>,

    /// How the companion link is detected: `follow-device` or a marker path.
    #[arg(long, env = "WSBRIDGE_COMPANION")]
    companion: Option<String>,

    /// How often the device node and companion marker are checked, in milliseconds.
    #[arg(long, env = "WSBRIDGE_DEVICE_POLL_MS")]
    device_poll_ms: Option<u64>,

    /// Interval of the re-evaluation heartbeat, in milliseconds.
    #[arg(long, env = "WSBRIDGE_HEARTBEAT_MS")]
    heartbeat_ms: Option<u64>,

    /// A WebSocket send slower than this marks traffic as slow.
    #[arg(long, env = "WSBRIDGE_SLOW_SEND_MS")]
    slow_send_ms: Option<u64>,

    /// Largest number of bytes moved per read/write cycle (1 to 1048576).
    #[arg(
        long,
        env = "WSBRIDGE_CHUNK_SIZE",
        value_parser = clap::value_parser!(u64).range(1..=MAX_CHUNK_SIZE as u64)
    )]
    chunk_size: Option<u64>,

    /// Upper bound on waiting for a relay pump to finish during teardown, in milliseconds.
    #[arg(long, env = "WSBRIDGE_CLEANUP_TIMEOUT_MS")]
    cleanup_timeout_ms: Option<u64>,

    /// `tracing` filter, e.g. `info` or `wsbridge=debug`.
    #[arg(long, env = "WSBRIDGE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Layers the file and then the command line over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or `--ws-bind` holds an invalid value.
    fn into_bridge_config(self, file: &FileConfig) -> anyhow::Result<BridgeConfig> {
        let mut config = BridgeConfig::default();
        file.apply_to(&mut config).context("invalid config file")?;

        if let Some(raw) = self.ws_bind {
            config.ws_bind_addr = raw
                .parse::<SocketAddr>()
                .with_context(|| format!("invalid WebSocket bind address: '{raw}'"))?;
        }
        if let Some(path) = self.device {
            config.device_path = path;
        }
        if let Some(probe) = self.companion {
            config.companion_probe = CompanionProbe::parse(&probe);
        }
        if let Some(ms) = self.device_poll_ms {
            config.device_poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.heartbeat_ms {
            config.heartbeat_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.slow_send_ms {
            config.slow_send_threshold = Duration::from_millis(ms);
        }
        if let Some(size) = self.chunk_size {
            config.relay.chunk_size =
                usize::try_from(size).context("chunk size does not fit in memory")?;
        }
        if let Some(ms) = self.cleanup_timeout_ms {
            config.relay.cleanup_timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

/// Picks the log filter: `--log-level`, then the file, then `info`.
fn log_filter(cli_level: Option<&str>, file: &FileConfig) -> String {
    cli_level
        .or(file.log_level.as_deref())
        .unwrap_or(DEFAULT_LOG_LEVEL)
        .to_string()
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// The `#[tokio::main]` attribute sets up the multi-threaded Tokio runtime
/// that hosts the relay pumps, the event loop and every peer task.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed into a [`Cli`], and the `--config` file, if
///    given, is loaded.  A missing or malformed file aborts startup.
/// 2. `tracing_subscriber` is initialised.  `RUST_LOG` wins over
///    `--log-level`, which wins over the file's `log_level`.
/// 3. The file and the command line are layered over the defaults into a
///    [`BridgeConfig`].
/// 4. A Ctrl+C handler is spawned; it clears a shared `AtomicBool`.
/// 5. The device and network transports, the [`Orchestrator`], the status
///    logger, the [`BridgeRuntime`] event loop and the device watcher are
///    created.
/// 6. [`run_server`] accepts WebSocket peers until the flag is cleared.
///
/// On the way out the watcher is joined, the runtime is shut down (which
/// tears down any live relay) and the status logger is stopped.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => FileConfig::default(),
    };

    // ── Logging setup ─────────────────────────────────────────────────────────
    let filter = log_filter(cli.log_level.as_deref(), &file);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = cli.into_bridge_config(&file)?;
    info!(
        ws = %config.ws_bind_addr,
        device = %config.device_path.display(),
        "wsbridge starting"
    );

    // ── Shutdown flag ─────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // ── Wiring ────────────────────────────────────────────────────────────────
    let (notifier, intake) = notification_channel(NOTIFICATION_CAPACITY);
    let device = Arc::new(DeviceTransport::new(
        config.device_path.clone(),
        config.companion_probe.clone(),
    ));
    let network = Arc::new(WsTransport::new(
        notifier.clone(),
        config.slow_send_threshold,
        config.relay.chunk_size,
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        device.clone(),
        network.clone(),
        Some(notifier.clone()),
        config.relay,
    ));
    let status_logger = spawn_status_logger(orchestrator.subscribe_status());
    let runtime = BridgeRuntime::initialize(orchestrator, intake, config.heartbeat_interval);
    let watcher = device.spawn_watcher(notifier, config.device_poll_interval, Arc::clone(&running));

    // ── Main server loop ──────────────────────────────────────────────────────
    let served = run_server(config.ws_bind_addr, network, Arc::clone(&running)).await;

    running.store(false, Ordering::Relaxed);
    if let Err(e) = watcher.await {
        warn!("device watcher ended abnormally: {e}");
    }
    runtime.shutdown().await;
    status_logger.abort();

    served?;
    info!("wsbridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
