//! Performance benchmarks for coedit-engine

use coedit_engine::{merge_operations, ConflictDetector, Operation, Transformer};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn batch(size: usize) -> Vec<Operation> {
    (0..size)
        .map(|i| {
            let author = format!("u{}", i % 5);
            let op = if i % 3 == 0 {
                Operation::delete((i % 40) as i64, 4, author)
            } else {
                Operation::insert((i % 40) as i64, "abc", author)
            };
            op.with_timestamp(i as u64 * 50)
        })
        .collect()
}

fn bench_transformer(c: &mut Criterion) {
    let mut group = c.benchmark_group("transformer");

    group.bench_function("apply_insert", |b| {
        let mut transformer = Transformer::new();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let op = Operation::insert((i % 100) as i64, "abc", "u1").with_timestamp(i * 10);
            transformer.apply(black_box(op))
        })
    });

    group.bench_function("apply_against_crowded_window", |b| {
        // every operation lands in the same region within the transform
        // window, forcing a transform on each apply
        let mut transformer = Transformer::new();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let op = Operation::insert(5, "x", format!("u{}", i % 3)).with_timestamp(i);
            transformer.apply(black_box(op))
        })
    });

    group.finish();
}

fn bench_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection");
    let detector = ConflictDetector::new();

    for size in [10usize, 100, 500] {
        let ops = batch(size);
        group.bench_with_input(BenchmarkId::new("detect", size), &ops, |b, ops| {
            b.iter(|| detector.detect(black_box(ops)))
        });
    }

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    let mut position = 0i64;
    let chain: Vec<Operation> = (0..200u64)
        .map(|i| {
            let op = Operation::insert(position, "ab", "u1").with_timestamp(i * 10);
            position += 2;
            op
        })
        .collect();

    group.bench_function("merge_long_chain", |b| {
        b.iter(|| merge_operations(black_box(chain.clone())))
    });

    group.finish();
}

criterion_group!(benches, bench_transformer, bench_detection, bench_merge);
criterion_main!(benches);
