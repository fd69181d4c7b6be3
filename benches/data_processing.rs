//! Benchmarks for the ingest hot path
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serial_plotter::ingest::{FrameAssembler, RecordParser, SeriesStore, Utf8Decoder};
use std::fmt::Write as _;

/// Build `lines` telemetry lines with `channels` pairs each
fn telemetry(lines: usize, channels: usize) -> String {
    let mut text = String::new();
    for i in 0..lines {
        for c in 0..channels {
            let _ = write!(text, "ch{} {:.3} ", c, (i as f64 * 0.01 + c as f64).sin() * 100.0);
        }
        text.pop();
        text.push('\n');
    }
    text
}

fn bench_frame_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_assembly");
    let text = telemetry(1000, 4);

    for chunk_size in [16, 256, 4096].iter() {
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("decode_and_split", chunk_size),
            chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut decoder = Utf8Decoder::new();
                    let mut assembler = FrameAssembler::new();
                    let mut count = 0usize;
                    for chunk in text.as_bytes().chunks(chunk_size) {
                        let decoded = decoder.decode(black_box(chunk));
                        count += assembler.feed(&decoded.text).count();
                    }
                    black_box(count)
                });
            },
        );
    }

    group.finish();
}

fn bench_record_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_parsing");
    let parser = RecordParser::new();

    for channels in [2, 8, 32].iter() {
        let text = telemetry(1, *channels);
        let line = text.trim_end().to_string();
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("parse", channels), &line, |b, line| {
            b.iter(|| black_box(parser.parse(black_box(line))))
        });
    }

    group.bench_function("parse_with_control_chars", |b| {
        let line = "temp\t21.5\u{0}\u{1}hum 40.2\u{7f}p 1013";
        b.iter(|| black_box(parser.parse(black_box(line))))
    });

    group.finish();
}

fn bench_store_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("series_store");

    for capacity in [500, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("apply_at_capacity", capacity),
            capacity,
            |b, &capacity| {
                let mut store = SeriesStore::new(capacity, Some(1000.0));
                for i in 0..capacity {
                    store.apply("x", i as f64);
                }
                let mut i = 0u64;
                b.iter(|| {
                    store.apply(black_box("x"), i as f64);
                    i = i.wrapping_add(1);
                });
            },
        );
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for channels in [1, 4, 16].iter() {
        let mut store = SeriesStore::new(500, None);
        for i in 0..500 {
            for ch in 0..*channels {
                store.apply(&format!("ch{}", ch), i as f64);
            }
        }

        group.throughput(Throughput::Elements((*channels * 500) as u64));
        group.bench_with_input(BenchmarkId::new("copy_out", channels), &store, |b, store| {
            b.iter(|| black_box(store.snapshot()))
        });
    }

    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let text = telemetry(1000, 4);
    group.throughput(Throughput::Elements(1000));

    group.bench_function("bytes_to_store", |b| {
        let parser = RecordParser::new();
        b.iter(|| {
            let mut decoder = Utf8Decoder::new();
            let mut assembler = FrameAssembler::new();
            let mut store = SeriesStore::new(500, None);
            for chunk in text.as_bytes().chunks(64) {
                let decoded = decoder.decode(chunk);
                for line in assembler.feed(&decoded.text) {
                    if let Ok(record) = parser.parse(&line) {
                        for (name, value) in &record.pairs {
                            store.apply(name, *value);
                        }
                    }
                }
            }
            black_box(store.len())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_assembly,
    bench_record_parsing,
    bench_store_apply,
    bench_snapshot,
    bench_full_pipeline,
);
criterion_main!(benches);
