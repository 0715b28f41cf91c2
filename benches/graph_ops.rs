//! Benchmarks for graph editing, request building and telemetry folding
//!
//! Run with: cargo bench

use botflow::execution::build_request;
use botflow::graph::{Graph, NodeCatalog, NodeId, PortRef, Position};
use botflow::telemetry::{initial_state, reconcile, KinematicModel, TelemetryPayload};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

/// A chain of `len` pass-through nodes fed by one input.
fn chain(len: usize) -> (Graph, Vec<NodeId>) {
    let catalog = NodeCatalog::builtin();
    let mut graph = Graph::new();
    let mut ids = Vec::with_capacity(len + 1);

    let Ok(input) = catalog.require("InputNode") else {
        return (graph, ids);
    };
    let Ok(delay) = catalog.require("DelayNode") else {
        return (graph, ids);
    };

    ids.push(graph.add_node(input, Position::default()));
    for i in 0..len {
        let id = graph.add_node(delay.clone(), Position::new(240.0 * (i + 1) as f64, 0.0));
        let prev = ids[ids.len() - 1].clone();
        let _ = graph.add_edge(PortRef::new(prev, "output"), PortRef::new(id.clone(), "input"));
        ids.push(id);
    }
    (graph, ids)
}

fn bench_add_edge(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_edge");

    for size in [10, 100, 500].iter() {
        let (graph, ids) = chain(*size);
        // Re-pointing the last input replaces its existing producer.
        let source = PortRef::new(ids[0].clone(), "output");
        let target = PortRef::new(ids[ids.len() - 1].clone(), "input");

        group.bench_with_input(BenchmarkId::new("replace", size), &graph, |b, graph| {
            b.iter_batched(
                || graph.clone(),
                |mut g| black_box(g.add_edge(source.clone(), target.clone())),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_execution_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("execution_order");

    for size in [10, 100, 1000].iter() {
        let (graph, _) = chain(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("chain", size), &graph, |b, graph| {
            b.iter(|| black_box(graph.execution_order()));
        });
    }

    group.finish();
}

fn bench_build_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_request");

    for size in [10, 100, 1000].iter() {
        let (graph, _) = chain(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("chain", size), &graph, |b, graph| {
            b.iter(|| black_box(build_request(graph)));
        });
    }

    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    let model = KinematicModel::so101();
    let joints = initial_state(&model);

    let pairs = TelemetryPayload::from_value(&json!([
        {"name": "Rotation", "angle": 12.0},
        {"name": "Elbow", "angle": 45.0},
        {"name": "Jaw", "angle": 3.5}
    ]));
    let servos = TelemetryPayload::from_value(&json!({
        "positions": {"1": 1024, "2": 2048, "3": 3072, "4": 512, "5": 100, "6": 4000}
    }));

    group.bench_function("joint_pairs", |b| {
        b.iter(|| black_box(reconcile(&joints, &pairs, &model)));
    });

    group.bench_function("servo_positions", |b| {
        b.iter(|| black_box(reconcile(&joints, &servos, &model)));
    });

    group.bench_function("parse_payload", |b| {
        let value = json!({"positions": {"1": 1024, "2": 2048}, "Elbow": 30.0});
        b.iter(|| black_box(TelemetryPayload::from_value(&value)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_add_edge,
    bench_execution_order,
    bench_build_request,
    bench_reconcile,
);

criterion_main!(benches);
