//! One-directional byte pump between two streams.
//!
//! A relay session runs two of these, one per direction.  Each pump is a
//! Tokio task that copies fixed-size chunks from its source to its sink until
//! the source reports end-of-input or either side fails.
//!
//! # Cancellation
//!
//! The task's future owns both stream handles.  [`RelayPump::cleanup`]
//! aborts the task, which drops the future and therefore closes both streams;
//! that is what unblocks a read that is waiting on a silent peer.  No
//! cooperative "please stop" flag is polled inside the copy loop.
//!
//! # Termination reporting
//!
//! The `running` flag is cleared with an atomic swap by whichever side gets
//! there first: the copy loop on natural exit, or `cleanup`.  Only the copy
//! loop's swap reports, and only if it observed `true`, so a pump reports its
//! own death at most once and never after a deliberate cleanup.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use wsbridge_core::{BridgeNotification, PumpExit, PumpExitReason};

use super::intake::BridgeNotifier;
use super::transport::{BoxedSink, BoxedSource};
use crate::domain::MAX_CHUNK_SIZE;

/// A cancellable one-directional relay task.
pub struct RelayPump {
    label: &'static str,
    chunk_size: usize,
    /// Present until `start` moves the streams into the task.
    streams: Option<(BoxedSource, BoxedSink)>,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    notifier: Option<BridgeNotifier>,
}

impl RelayPump {
    /// Creates an idle pump.  Nothing is read until [`start`](Self::start).
    ///
    /// `notifier` receives a [`BridgeNotification::PumpExited`] if the pump
    /// dies on its own.
    pub fn new(
        source: BoxedSource,
        sink: BoxedSink,
        label: &'static str,
        chunk_size: usize,
        notifier: Option<BridgeNotifier>,
    ) -> Self {
        Self {
            label,
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
            streams: Some((source, sink)),
            running: Arc::new(AtomicBool::new(false)),
            task: None,
            notifier,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// `true` while the copy loop is live.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawns the copy loop.
    ///
    /// Returns `false` without doing anything if the pump was already started
    /// or cleaned up.
    pub fn start(&mut self) -> bool {
        let Some((mut source, mut sink)) = self.streams.take() else {
            debug!(pump = self.label, "start ignored; streams already consumed");
            return false;
        };

        let label = self.label;
        let chunk_size = self.chunk_size;
        let running = Arc::clone(&self.running);
        let notifier = self.notifier.clone();

        running.store(true, Ordering::Release);
        self.task = Some(tokio::spawn(async move {
            let reason = copy_until_closed(&mut source, &mut sink, chunk_size).await;
            drop(source);
            drop(sink);

            if running.swap(false, Ordering::AcqRel) {
                match &reason {
                    PumpExitReason::EndOfInput { .. } => info!(pump = label, "relay pump stopped: {reason}"),
                    PumpExitReason::IoFailure { .. } => warn!(pump = label, "relay pump stopped: {reason}"),
                }
                if let Some(notifier) = notifier {
                    notifier.try_notify(BridgeNotification::PumpExited(PumpExit {
                        label: label.to_string(),
                        reason,
                    }));
                }
            }
        }));

        debug!(pump = label, "relay pump started");
        true
    }

    /// Stops the pump and closes both streams.
    ///
    /// Safe to call before `start`, after the pump died on its own, more than
    /// once, and from any task.  Waits at most `timeout` for the task to exit.
    pub async fn cleanup(&mut self, timeout: Duration) {
        self.running.store(false, Ordering::Release);

        if self.streams.take().is_some() {
            debug!(pump = self.label, "closed streams of a pump that never started");
        }

        let Some(task) = self.task.take() else {
            return;
        };

        task.abort();
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(())) => debug!(pump = self.label, "relay pump had already finished"),
            Ok(Err(e)) if e.is_cancelled() => debug!(pump = self.label, "relay pump cancelled"),
            Ok(Err(e)) => warn!(pump = self.label, "relay pump task failed: {e}"),
            Err(_) => warn!(
                pump = self.label,
                "relay pump did not exit within {timeout:?}; abandoning it"
            ),
        }
    }
}

impl std::fmt::Debug for RelayPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayPump")
            .field("label", &self.label)
            .field("running", &self.is_running())
            .field("started", &self.task.is_some())
            .finish()
    }
}

/// Copies `source` into `sink` until EOF or an I/O error.
async fn copy_until_closed(
    source: &mut BoxedSource,
    sink: &mut BoxedSink,
    chunk_size: usize,
) -> PumpExitReason {
    let mut buf = vec![0u8; chunk_size];
    let mut bytes_relayed: u64 = 0;

    loop {
        let n = match source.read(&mut buf).await {
            Ok(0) => {
                // Propagate the half-close; the peer may already be gone.
                let _ = sink.shutdown().await;
                return PumpExitReason::EndOfInput { bytes_relayed };
            }
            Ok(n) => n,
            Err(e) => {
                return PumpExitReason::IoFailure {
                    message: format!("read failed: {e}"),
                }
            }
        };

        if let Err(e) = sink.write_all(&buf[..n]).await {
            return PumpExitReason::IoFailure {
                message: format!("write failed: {e}"),
            };
        }
        if let Err(e) = sink.flush().await {
            return PumpExitReason::IoFailure {
                message: format!("flush failed: {e}"),
            };
        }
        bytes_relayed += n as u64;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
