use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use thaw::parser::parse_document;
use thaw::{reconstruct, ReconstructOptions};
use thaw_tests::synthetic_document;

fn parse_1000_bench(c: &mut Criterion) {
    let text = synthetic_document(1000);
    c.bench_function("parse 1000 blocks", |b| {
        b.iter(|| parse_document("synthetic.json", black_box(&text)).unwrap())
    });
}

fn reconstruct_1000_bench(c: &mut Criterion) {
    let doc = parse_document("synthetic.json", &synthetic_document(1000)).unwrap();
    let options = ReconstructOptions::default();
    c.bench_function("reconstruct 1000 blocks", |b| {
        b.iter(|| reconstruct(black_box(std::slice::from_ref(&doc)), &options).unwrap())
    });
}

// ─── Multi-document merge ────────────────────────────────────────────────────

fn reconstruct_10x100_bench(c: &mut Criterion) {
    let docs: Vec<_> = (0..10)
        .map(|i| {
            parse_document(&format!("unit{}.json", i), &synthetic_document(100)).unwrap()
        })
        .collect();
    let options = ReconstructOptions::default();
    c.bench_function("reconstruct 10 documents x 100 blocks", |b| {
        b.iter(|| reconstruct(black_box(&docs), &options).unwrap())
    });
}

criterion_group!(
    benches,
    parse_1000_bench,
    reconstruct_1000_bench,
    reconstruct_10x100_bench
);
criterion_main!(benches);
