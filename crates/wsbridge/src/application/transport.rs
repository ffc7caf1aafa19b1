//! The transport seam shared by the device and network sides.
//!
//! Both transports are symmetric from the orchestrator's point of view: each
//! can lend one [`StreamPair`] while it is fully connected, and takes it back
//! through [`Transport::release_stream_pair`].  The orchestrator depends only
//! on this trait, so tests plug in in-memory transports.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Readable half lent by a transport.
pub type BoxedSource = Box<dyn AsyncRead + Send + Unpin>;
/// Writable half lent by a transport.
pub type BoxedSink = Box<dyn AsyncWrite + Send + Unpin>;

/// A connected (source, sink) pair lent for the duration of one relay session.
pub struct StreamPair {
    pub source: BoxedSource,
    pub sink: BoxedSink,
}

impl StreamPair {
    pub fn new<R, W>(source: R, sink: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            source: Box::new(source),
            sink: Box::new(sink),
        }
    }

    /// Splits one duplex stream into a pair.
    pub fn from_duplex<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (source, sink) = tokio::io::split(stream);
        Self::new(source, sink)
    }
}

impl std::fmt::Debug for StreamPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StreamPair { .. }")
    }
}

/// A collaborator that owns one side of the bridge.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in log fields, e.g. `"device"`.
    fn name(&self) -> &str;

    /// Lends the connected stream pair, or `None` when not fully connected or
    /// when a pair is already lent out.
    async fn acquire_stream_pair(&self) -> Option<StreamPair>;

    /// Takes back the previously lent pair.  Idempotent.
    async fn release_stream_pair(&self);
}
