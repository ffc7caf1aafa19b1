//! Criterion benchmarks for relay pump throughput.
//!
//! Pushes a fixed payload through one `RelayPump` wired between two in-memory
//! pipes, for a few chunk sizes.
//!
//! Run with:
//! ```bash
//! cargo bench --package wsbridge --bench relay_bench
//! ```

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};
use tokio::runtime::Runtime;

use wsbridge::application::RelayPump;

const PAYLOAD_BYTES: usize = 1 << 20;

/// Relays `PAYLOAD_BYTES` through a fresh pump and waits for all of it.
async fn relay_once(chunk_size: usize, payload: &[u8]) {
    let (mut upstream, pump_source) = duplex(64 * 1024);
    let (pump_sink, mut downstream) = duplex(64 * 1024);
    let mut pump = RelayPump::new(
        Box::new(pump_source),
        Box::new(pump_sink),
        "bench",
        chunk_size,
        None,
    );
    pump.start();

    let writer = async {
        upstream.write_all(payload).await.unwrap();
        upstream.shutdown().await.unwrap();
    };
    let reader = async {
        let mut received = Vec::with_capacity(payload.len());
        downstream.read_to_end(&mut received).await.unwrap();
        received.len()
    };
    let ((), received) = tokio::join!(writer, reader);
    assert_eq!(received, payload.len());

    pump.cleanup(Duration::from_secs(1)).await;
}

fn bench_pump_throughput(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let payload = vec![0x5Au8; PAYLOAD_BYTES];

    let mut group = c.benchmark_group("relay_pump");
    group.throughput(Throughput::Bytes(PAYLOAD_BYTES as u64));
    for chunk_size in [1024usize, 8192, 32768] {
        group.bench_with_input(BenchmarkId::new("chunk", chunk_size), &chunk_size, |b, &size| {
            b.to_async(&rt).iter(|| relay_once(size, &payload));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pump_throughput);
criterion_main!(benches);
