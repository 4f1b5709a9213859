//! Criterion benchmarks for the rawsink hot path.
//!
//! Measures the per-event cost of the drain loop's pure work: the key state
//! tracker decision and the 11-byte encoding, plus receiver-side decoding.
//!
//! Run with:
//! ```bash
//! cargo bench --package rawsink-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rawsink_core::{decode_message, encode_message, DeviceId, KeyStateTracker, KeyboardEvent, ScanCode};

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let cases = [
        ("key_down", KeyboardEvent::down(DeviceId(0x0001_0041), ScanCode::KeyA)),
        ("extended_key_up", KeyboardEvent::up(DeviceId(0x0001_0041), ScanCode::ControlRight)),
    ];
    for (name, event) in &cases {
        group.bench_with_input(BenchmarkId::new("event", name), event, |b, event| {
            b.iter(|| encode_message(black_box(event)))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let bytes = encode_message(&KeyboardEvent::down(DeviceId(0x0001_0041), ScanCode::ArrowUp));
    c.bench_function("decode/key_down", |b| b.iter(|| decode_message(black_box(&bytes))));
}

fn bench_tracker_then_encode(c: &mut Criterion) {
    let device = DeviceId(0x0001_0041);
    // A typing burst with key-repeat on Shift.
    let burst: Vec<KeyboardEvent> = [ScanCode::KeyH, ScanCode::KeyE, ScanCode::KeyL, ScanCode::KeyL, ScanCode::KeyO]
        .iter()
        .flat_map(|&k| {
            [
                KeyboardEvent::down(device, ScanCode::ShiftLeft),
                KeyboardEvent::down(device, k),
                KeyboardEvent::up(device, k),
            ]
        })
        .chain(std::iter::once(KeyboardEvent::up(device, ScanCode::ShiftLeft)))
        .collect();

    c.bench_function("drain_hot_path/typing_burst", |b| {
        b.iter(|| {
            let mut tracker = KeyStateTracker::new();
            let mut sent = 0usize;
            for event in &burst {
                if tracker.apply(event) == rawsink_core::KeyTransition::Forward {
                    sent += encode_message(black_box(event)).len();
                }
            }
            sent
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_tracker_then_encode);
criterion_main!(benches);
