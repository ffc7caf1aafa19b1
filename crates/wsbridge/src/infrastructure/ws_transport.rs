//! WebSocket network transport: accept loop and the single-peer task.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Upgrading each incoming connection to a WebSocket.
//! 3. Keeping at most one active peer.  Later peers receive a Close frame
//!    with reason `busy` and are dropped.
//! 4. Reporting peer connect/disconnect as `NetworkLink` notifications.
//! 5. Lending the peer to the relay as a byte stream pair.
//!
//! # How the peer becomes a byte stream
//!
//! `acquire_stream_pair` creates an in-memory `tokio::io::duplex` pipe.  One
//! end is lent to the relay.  The other end is split and handed to the peer
//! task: its write half receives the payload of every inbound frame, and
//! every chunk read from its read half goes out as a binary frame.  When the
//! relay drops its end, both halves see EOF or a broken pipe and the peer task
//! detaches them.
//!
//! Each direction runs as its own branch of the peer task, so a relay that is
//! slow to drain inbound frames does not hold up outbound frames.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message as WsMessage,
    },
    WebSocketStream,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use wsbridge_core::{BridgeNotification, TrafficMonitor};

use crate::application::{BridgeNotifier, StreamPair, Transport};
use crate::domain::MAX_CHUNK_SIZE;

type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;
type InboundAttach = mpsc::Receiver<WriteHalf<DuplexStream>>;
type OutboundAttach = mpsc::Receiver<ReadHalf<DuplexStream>>;

/// How long one `accept()` waits before the loop re-checks `running`.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Close reason sent to a peer that arrives while another one is active.
pub const BUSY_REASON: &str = "busy";

/// The attachment channels of the currently active peer.
struct PeerSlot {
    id: Uuid,
    addr: SocketAddr,
    inbound_tx: mpsc::Sender<WriteHalf<DuplexStream>>,
    outbound_tx: mpsc::Sender<ReadHalf<DuplexStream>>,
}

/// Network side of the bridge.
pub struct WsTransport {
    notifier: BridgeNotifier,
    monitor: TrafficMonitor,
    chunk_size: usize,
    peer: Mutex<Option<PeerSlot>>,
    lent: AtomicBool,
}

impl WsTransport {
    pub fn new(notifier: BridgeNotifier, slow_send_threshold: Duration, chunk_size: usize) -> Self {
        Self {
            notifier,
            monitor: TrafficMonitor::new(slow_send_threshold),
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
            peer: Mutex::new(None),
            lent: AtomicBool::new(false),
        }
    }

    /// Address of the active peer, if any.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.slot().as_ref().map(|p| p.addr)
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<PeerSlot>> {
        self.peer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the peer slot.  Returns `None` if another peer holds it.
    fn claim(&self, addr: SocketAddr) -> Option<(Uuid, InboundAttach, OutboundAttach)> {
        let mut slot = self.slot();
        if slot.is_some() {
            return None;
        }
        let (inbound_tx, inbound_rx) = mpsc::channel(4);
        let (outbound_tx, outbound_rx) = mpsc::channel(4);
        let id = Uuid::new_v4();
        *slot = Some(PeerSlot {
            id,
            addr,
            inbound_tx,
            outbound_tx,
        });
        Some((id, inbound_rx, outbound_rx))
    }

    fn vacate(&self, id: Uuid) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|p| p.id == id) {
            *slot = None;
        }
    }

    /// Times one outbound send and reports a traffic-quality change.
    async fn record_send(&self, elapsed: Duration) {
        if let Some(shift) = self.monitor.observe(elapsed) {
            self.notifier
                .notify(BridgeNotification::TrafficQuality {
                    slow: shift.is_slow(),
                    message: shift.message().to_string(),
                })
                .await;
        }
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("peer", &self.peer_addr())
            .field("lent", &self.lent.load(Ordering::Relaxed))
            .field("slow", &self.monitor.is_slow())
            .finish()
    }
}

#[async_trait]
impl Transport for WsTransport {
    fn name(&self) -> &str {
        "network"
    }

    async fn acquire_stream_pair(&self) -> Option<StreamPair> {
        if self
            .lent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("network stream pair already lent");
            return None;
        }

        let senders = self
            .slot()
            .as_ref()
            .map(|p| (p.inbound_tx.clone(), p.outbound_tx.clone()));
        let Some((inbound_tx, outbound_tx)) = senders else {
            self.lent.store(false, Ordering::Release);
            return None;
        };

        let (relay_end, peer_end) = duplex(self.chunk_size * 2);
        let (peer_rx, peer_tx) = tokio::io::split(peer_end);
        if inbound_tx.send(peer_tx).await.is_err() || outbound_tx.send(peer_rx).await.is_err() {
            // The peer went away between the slot read and the send.
            self.lent.store(false, Ordering::Release);
            return None;
        }
        Some(StreamPair::from_duplex(relay_end))
    }

    async fn release_stream_pair(&self) {
        if self.lent.swap(false, Ordering::AcqRel) {
            debug!("network stream pair returned");
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `addr` and runs the accept loop until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server(
    addr: SocketAddr,
    transport: Arc<WsTransport>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {addr}"))?;
    info!("WebSocket listener on {addr}");
    serve(listener, transport, running).await;
    Ok(())
}

/// Runs the accept loop on an already bound listener.
pub async fn serve(listener: TcpListener, transport: Arc<WsTransport>, running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("TCP connection from {peer_addr}");
                let transport = Arc::clone(&transport);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, peer_addr, transport).await {
                        warn!("peer {peer_addr} closed with error: {e:#}");
                    }
                });
            }
            Ok(Err(e)) => error!("accept error: {e}"),
            Err(_) => {}
        }
    }
    info!("shutdown flag set; stopping accept loop");
}

// ── Per-peer handling ─────────────────────────────────────────────────────────

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    transport: Arc<WsTransport>,
) -> anyhow::Result<()> {
    let mut ws = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let Some((id, inbound_rx, outbound_rx)) = transport.claim(peer_addr) else {
        info!("rejecting {peer_addr}: another peer is active");
        let frame = CloseFrame {
            code: CloseCode::Again,
            reason: BUSY_REASON.into(),
        };
        // The peer may hang up first; nothing to do about it.
        let _ = ws.send(WsMessage::Close(Some(frame))).await;
        return Ok(());
    };

    info!("peer connected: {peer_addr}");
    transport
        .notifier
        .notify(BridgeNotification::NetworkLink {
            connected: true,
            peer: Some(peer_addr.to_string()),
        })
        .await;

    let (ws_tx, ws_rx) = ws.split();
    tokio::select! {
        _ = pump_inbound(ws_rx, inbound_rx) => debug!("peer {peer_addr}: inbound side ended"),
        _ = pump_outbound(ws_tx, outbound_rx, &transport) => debug!("peer {peer_addr}: outbound side ended"),
    }

    // The slot is vacated only after the disconnect is queued, so the next
    // peer's `connected: true` can never overtake it.
    transport.monitor.reset();
    info!("peer disconnected: {peer_addr}");
    transport
        .notifier
        .notify(BridgeNotification::NetworkLink {
            connected: false,
            peer: Some(peer_addr.to_string()),
        })
        .await;
    transport.vacate(id);
    Ok(())
}

/// Writes the payload of each inbound frame into the attached relay pipe.
async fn pump_inbound(mut ws_rx: WsSource, mut attach_rx: InboundAttach) {
    let mut relay: Option<WriteHalf<DuplexStream>> = None;

    loop {
        tokio::select! {
            attached = attach_rx.recv() => match attached {
                Some(writer) => relay = Some(writer),
                None => return,
            },
            frame = ws_rx.next() => {
                let payload = match frame {
                    Some(Ok(WsMessage::Binary(data))) => data,
                    Some(Ok(WsMessage::Text(text))) => text.into_bytes(),
                    Some(Ok(WsMessage::Close(_))) | None => return,
                    // Ping/pong replies are handled by tungstenite.
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!("WebSocket read error: {e}");
                        return;
                    }
                };
                let Some(writer) = relay.as_mut() else {
                    debug!(bytes = payload.len(), "no relay attached; frame dropped");
                    continue;
                };
                if writer.write_all(&payload).await.is_err() {
                    debug!("relay detached (inbound)");
                    relay = None;
                }
            }
        }
    }
}

/// Sends every chunk read from the attached relay pipe as a binary frame.
async fn pump_outbound(
    mut ws_tx: WsSink,
    mut attach_rx: OutboundAttach,
    transport: &WsTransport,
) {
    let mut relay: Option<ReadHalf<DuplexStream>> = None;
    let mut buf = vec![0u8; transport.chunk_size];

    loop {
        tokio::select! {
            attached = attach_rx.recv() => match attached {
                Some(reader) => relay = Some(reader),
                None => return,
            },
            read = read_attached(&mut relay, &mut buf) => match read {
                Ok(0) | Err(_) => {
                    debug!("relay detached (outbound)");
                    relay = None;
                }
                Ok(n) => {
                    let started = Instant::now();
                    if let Err(e) = ws_tx.send(WsMessage::Binary(buf[..n].to_vec())).await {
                        debug!("WebSocket send failed: {e}");
                        return;
                    }
                    transport.record_send(started.elapsed()).await;
                }
            },
        }
    }
}

/// Reads from the relay pipe, or waits forever when none is attached.
async fn read_attached(
    relay: &mut Option<ReadHalf<DuplexStream>>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match relay {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
