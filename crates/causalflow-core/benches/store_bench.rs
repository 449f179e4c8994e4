//! # Store Benchmarks
//!
//! Performance benchmarks for session mutations and evidence bookkeeping.
//!
//! Run with: `cargo bench -p causalflow-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use causalflow_core::{DataImport, Distribution, DistributionMap, Edge, LearnedStructure, Session};
use std::collections::BTreeMap;
use std::hint::black_box;

fn column(i: usize) -> String {
    format!("col{i}")
}

/// A dataset summary with `size` two-state columns.
fn wide_import(size: usize) -> DataImport {
    let columns: Vec<String> = (0..size).map(column).collect();
    let meta_info: BTreeMap<String, Vec<String>> = columns
        .iter()
        .map(|c| (c.clone(), vec!["yes".to_string(), "no".to_string()]))
        .collect();
    DataImport {
        columns,
        meta_info,
        row_count: 1000,
        column_count: Some(size),
    }
}

/// A session with `size` columns chained col0 -> col1 -> ...
fn chained_session(size: usize) -> Session {
    let mut session = Session::new();
    wide_import(size).apply(&mut session).expect("import");
    for i in 1..size {
        session
            .add_edge(&column(i - 1), &column(i))
            .expect("edge");
    }
    session
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("import");

    for size in [10, 100, 1000].iter() {
        let import = wide_import(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &import, |b, import| {
            b.iter(|| {
                let mut session = Session::new();
                let _ = import.apply(&mut session);
                black_box(session)
            });
        });
    }

    group.finish();
}

fn bench_add_edges(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_edges");

    for size in [10, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(chained_session(size)));
        });
    }

    group.finish();
}

fn bench_learned_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("learned_replace");

    for size in [10, 100, 500].iter() {
        let session = chained_session(*size);
        let learned = LearnedStructure {
            edges: (1..*size).map(|i| Edge::new(column(0), column(i))).collect(),
            edge_count: None,
        };

        group.bench_with_input(BenchmarkId::from_parameter(size), &learned, |b, learned| {
            b.iter(|| {
                let mut session = session.clone();
                black_box(learned.apply(&mut session))
            });
        });
    }

    group.finish();
}

fn bench_remove_hub(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_hub");

    for size in [10, 100, 500].iter() {
        let mut session = chained_session(*size);
        let star = LearnedStructure {
            edges: (1..*size).map(|i| Edge::new(column(0), column(i))).collect(),
            edge_count: None,
        };
        star.apply(&mut session).expect("star");

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut session = session.clone();
                black_box(session.remove_node(&column(0)))
            });
        });
    }

    group.finish();
}

fn bench_evidence_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("evidence_round");

    for size in [10, 100, 1000].iter() {
        let mut session = chained_session(*size);
        session.set_trained(true).expect("trained");
        let result: DistributionMap = (0..*size)
            .map(|i| {
                let dist: Distribution = [("yes", 0.5), ("no", 0.5)].into_iter().collect();
                (column(i), dist)
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &result, |b, result| {
            b.iter(|| {
                let ticket = session
                    .toggle_evidence(&column(0), "yes")
                    .expect("toggle")
                    .expect("ticket");
                black_box(session.accept_inference(ticket.token, result.clone()))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_import,
    bench_add_edges,
    bench_learned_replace,
    bench_remove_hub,
    bench_evidence_round,
);
criterion_main!(benches);
