//! Envelope codec benchmark suite.
//!
//! Benchmarks encoding of client envelopes and decoding of server frames
//! at different payload sizes.
//!
//! Run with: cargo bench --bench envelope_codec
//! Results saved to: target/criterion/

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;
use std::hint::black_box;

use twidder_session::{ClientAction, InboundEnvelope, OutboundEnvelope, RequestId, ServerAction};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PAYLOAD_SIZES: &[usize] = &[16, 256, 4096];

fn message_payload(size: usize) -> serde_json::Value {
    json!({
        "from": "alice@example.com",
        "text": "x".repeat(size),
    })
}

// ============================================================================
// Benchmark: Encode
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    let login = OutboundEnvelope::new(RequestId::new(0), ClientAction::Login, Some(json!("tok123")));
    group.bench_function("login", |b| {
        b.iter(|| black_box(&login).encode().expect("encode"));
    });

    let ping = OutboundEnvelope::new(RequestId::new(7), ClientAction::Ping, Some(json!(0xDEAD_BEEF_u64)));
    group.bench_function("heartbeat", |b| {
        b.iter(|| black_box(&ping).encode().expect("encode"));
    });

    group.finish();
}

// ============================================================================
// Benchmark: Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for &size in PAYLOAD_SIZES {
        let frame = InboundEnvelope::new(ServerAction::NewMessage, Some(message_payload(size)))
            .encode()
            .expect("encode");

        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("new_message", size), &frame, |b, frame| {
            b.iter(|| InboundEnvelope::decode(black_box(frame)).expect("decode"));
        });
    }

    let malformed = r#"{"action":"NOT_AN_ACTION","data":1}"#;
    group.bench_function("malformed", |b| {
        b.iter(|| InboundEnvelope::decode(black_box(malformed)).is_err());
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
