//! Criterion micro-benchmarks for graph parsing and candidate search.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use fas_bench::{complete_digraph, example_graph, random_graph};
use fas_graph::{FasSearcher, Graph};

/// Benchmark: one candidate from the nine-edge example graph.
fn bench_candidate_example(c: &mut Criterion) {
    let mut searcher = FasSearcher::new(example_graph(), 42);
    c.bench_function("candidate_example_9e", |b| {
        b.iter(|| black_box(searcher.next_candidate()));
    });
}

/// Benchmark: one candidate from a 1K-vertex, 5K-edge random graph.
///
/// Nearly every candidate spills past the inline slot capacity.
fn bench_candidate_random_5k(c: &mut Criterion) {
    let mut searcher = FasSearcher::new(random_graph(1_000, 5_000, 7), 42);
    c.bench_function("candidate_random_1kv_5ke", |b| {
        b.iter(|| black_box(searcher.next_candidate()));
    });
}

/// Benchmark: candidate from K16 with both directions (120 backward edges).
fn bench_candidate_complete_16(c: &mut Criterion) {
    let mut searcher = FasSearcher::new(complete_digraph(16), 42);
    c.bench_function("candidate_complete_16", |b| {
        b.iter(|| black_box(searcher.next_candidate()));
    });
}

/// Benchmark: parse and deduplicate a 1K-edge command line.
fn bench_parse_1k(c: &mut Criterion) {
    let args: Vec<String> = random_graph(200, 1_000, 3)
        .edges()
        .iter()
        .map(|e| e.to_string())
        .collect();
    c.bench_function("parse_graph_1k", |b| {
        b.iter(|| black_box(Graph::parse(&args).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_candidate_example,
    bench_candidate_random_5k,
    bench_candidate_complete_16,
    bench_parse_1k
);
criterion_main!(benches);
