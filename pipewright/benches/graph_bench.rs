//! Benchmarks for dependency level resolution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pipewright::graph::{DependencyGraphResolver, LevelResolver};
use std::collections::HashMap;

/// `width` services per layer, each depending on every service of the layer below.
fn layered_graph(layers: usize, width: usize) -> HashMap<String, Vec<String>> {
    let mut graph = HashMap::new();
    for layer in 0..layers {
        for i in 0..width {
            let deps = if layer == 0 {
                Vec::new()
            } else {
                (0..width).map(|j| format!("svc-{}-{j}", layer - 1)).collect()
            };
            graph.insert(format!("svc-{layer}-{i}"), deps);
        }
    }
    graph
}

fn resolve_benchmark(c: &mut Criterion) {
    let resolver = LevelResolver::new();
    let mut group = c.benchmark_group("resolve");
    for (layers, width) in [(4, 8), (8, 32), (16, 64)] {
        let graph = layered_graph(layers, width);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{layers}x{width}")),
            &graph,
            |b, graph| b.iter(|| resolver.resolve(black_box(graph))),
        );
    }
    group.finish();
}

criterion_group!(benches, resolve_benchmark);
criterion_main!(benches);
