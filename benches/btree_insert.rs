//! Insert and search throughput for the B+ tree.
//!
//! Run with: `cargo bench --bench btree_insert`

use std::hint::black_box;

use blockidx::{BlockId, IndexFile, Key, KeyType};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const ENTRIES: i32 = 20_000;

fn scrambled(n: i32) -> impl Iterator<Item = i32> {
    // 7919 is prime, so this visits every residue once
    (0..n).map(move |i| (i * 7919) % n)
}

fn build(order: u16) -> IndexFile {
    let mut index = IndexFile::new(order, KeyType::Int32).unwrap();
    for k in scrambled(ENTRIES) {
        index.insert(&Key::from(k), BlockId::new(1)).unwrap();
    }
    index
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(ENTRIES as u64));
    group.sample_size(20);

    for order in [4u16, 16, 64, 256] {
        group.bench_with_input(BenchmarkId::new("int32_random", order), &order, |b, &order| {
            b.iter(|| black_box(build(order)));
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.throughput(Throughput::Elements(ENTRIES as u64));

    for order in [4u16, 64, 256] {
        let index = build(order);
        group.bench_with_input(BenchmarkId::new("int32_hit", order), &index, |b, index| {
            b.iter(|| {
                for k in scrambled(ENTRIES) {
                    black_box(index.search(&Key::from(k)).unwrap());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_search);
criterion_main!(benches);
