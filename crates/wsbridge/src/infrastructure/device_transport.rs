//! Character-device transport: the locally attached side of the bridge.
//!
//! Attachment is detected by polling for the device node (by default the USB
//! gadget serial port `/dev/ttyGS0`, which appears when a host enumerates the
//! gadget).  A watcher task reports changes as `DeviceLink` and
//! `CompanionLink` notifications.
//!
//! The stream pair is the device node opened read/write with `O_NONBLOCK`
//! and registered with the reactor through [`AsyncFd`].  Both halves share
//! one descriptor, which is closed when the last half is dropped, so
//! aborting a relay pump also cancels its pending read.  No blocking thread
//! keeps reading on behalf of a session that has already been torn down.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::task::{ready, Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use nix::fcntl::OFlag;
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use wsbridge_core::BridgeNotification;

use crate::application::{BridgeNotifier, StreamPair, Transport};
use crate::domain::CompanionProbe;

/// Device side of the bridge.
#[derive(Debug)]
pub struct DeviceTransport {
    device_path: PathBuf,
    companion: CompanionProbe,
    lent: AtomicBool,
}

/// One observation of the device side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceProbe {
    pub attached: bool,
    pub companion_linked: bool,
}

impl DeviceTransport {
    pub fn new(device_path: impl Into<PathBuf>, companion: CompanionProbe) -> Self {
        Self {
            device_path: device_path.into(),
            companion,
            lent: AtomicBool::new(false),
        }
    }

    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    /// Checks the device node and the companion probe once.
    pub async fn probe(&self) -> DeviceProbe {
        let attached = path_present(&self.device_path).await;
        let companion_linked = match &self.companion {
            CompanionProbe::FollowDevice => attached,
            CompanionProbe::Marker(marker) => path_present(marker).await,
        };
        DeviceProbe {
            attached,
            companion_linked,
        }
    }

    /// Spawns the polling watcher.  It stops once `running` is cleared.
    ///
    /// All signals start `false`, so only a probe that differs from the
    /// previous one (initially both `false`) is reported.
    pub fn spawn_watcher(
        self: &Arc<Self>,
        notifier: BridgeNotifier,
        poll_interval: Duration,
        running: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let transport = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval.max(Duration::from_millis(10)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last = DeviceProbe::default();

            while running.load(Ordering::Relaxed) {
                ticker.tick().await;
                let now = transport.probe().await;

                if now.attached != last.attached {
                    info!(path = %transport.device_path.display(), attached = now.attached, "device link changed");
                    notifier
                        .notify(BridgeNotification::DeviceLink {
                            connected: now.attached,
                        })
                        .await;
                }
                if now.companion_linked != last.companion_linked {
                    info!(linked = now.companion_linked, "companion link changed");
                    notifier
                        .notify(BridgeNotification::CompanionLink {
                            connected: now.companion_linked,
                        })
                        .await;
                }
                last = now;
            }
            debug!("device watcher stopped");
        })
    }
}

#[async_trait]
impl Transport for DeviceTransport {
    fn name(&self) -> &str {
        "device"
    }

    async fn acquire_stream_pair(&self) -> Option<StreamPair> {
        if self
            .lent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("device stream pair already lent");
            return None;
        }

        match open_nonblocking(&self.device_path) {
            Ok(fd) => {
                let fd = Arc::new(fd);
                Some(StreamPair::new(DeviceReader(Arc::clone(&fd)), DeviceWriter(fd)))
            }
            Err(e) => {
                warn!(path = %self.device_path.display(), "cannot open device: {e}");
                self.lent.store(false, Ordering::Release);
                None
            }
        }
    }

    async fn release_stream_pair(&self) {
        if self.lent.swap(false, Ordering::AcqRel) {
            debug!("device stream pair returned");
        }
    }
}

async fn path_present(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Opens the node without blocking and without making it our controlling
/// terminal.  Fails for paths the reactor cannot poll, such as regular files.
fn open_nonblocking(path: &Path) -> io::Result<AsyncFd<File>> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags((OFlag::O_NONBLOCK | OFlag::O_NOCTTY).bits())
        .open(path)?;
    AsyncFd::new(file)
}

/// Read half of an opened device.
struct DeviceReader(Arc<AsyncFd<File>>);

/// Write half of an opened device.
struct DeviceWriter(Arc<AsyncFd<File>>);

impl AsyncRead for DeviceReader {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.0.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|fd| {
                let mut file = fd.get_ref();
                file.read(unfilled)
            }) {
                Ok(Ok(n)) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(e)) => return Poll::Ready(Err(e)),
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsyncWrite for DeviceWriter {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, data: &[u8]) -> Poll<io::Result<usize>> {
        loop {
            let mut guard = ready!(self.0.poll_write_ready(cx))?;
            match guard.try_io(|fd| {
                let mut file = fd.get_ref();
                file.write(data)
            }) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
