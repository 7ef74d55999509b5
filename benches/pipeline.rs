//! Performance benchmarks for the consolidation pipeline.
//!
//! Run with: `cargo bench --features synthetic`
//!
//! Networks come from the seeded grid generator, so every run measures
//! the same routes and shipments.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use freightmatch::synthetic::{SyntheticDataset, SyntheticNetwork};
use freightmatch::{
    ConsolidationConfig, ConsolidationEngine, EvaluationConfig, FreightIndex, NoopProgress,
    evaluate, geometry,
    intersections::{ComparedPairs, IntersectionPointSet, scan_routes},
    sections::section_routes,
};

fn network(route_count: usize) -> SyntheticDataset {
    SyntheticNetwork {
        grid_size: 12,
        route_count,
        shipments_per_route: 30,
        ..SyntheticNetwork::default()
    }
    .generate()
}

fn run_engine(dataset: &SyntheticDataset) -> ConsolidationEngine {
    let mut engine = ConsolidationEngine::new();
    for route in &dataset.routes {
        let _ = engine.add_route(route.clone());
    }
    engine.add_shipments(dataset.shipments.clone());
    engine.run();
    engine
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_pair_intersection(c: &mut Criterion) {
    let dataset = network(2);
    let a = &dataset.routes[0].geometry;
    let b = &dataset.routes[1].geometry;

    c.bench_function("intersect_two_routes", |bench| {
        bench.iter(|| geometry::intersection(black_box(a), black_box(b), 1e-7))
    });
}

fn bench_intersection_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersection_scan");
    group.sample_size(10);

    for count in [25usize, 50, 100].iter() {
        let dataset = network(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &dataset, |b, data| {
            b.iter(|| {
                let mut compared = ComparedPairs::new();
                let mut points = IntersectionPointSet::new(1e-7);
                let mut diagnostics = freightmatch::Diagnostics::new();
                scan_routes(
                    black_box(&data.routes),
                    &mut compared,
                    &mut points,
                    &mut diagnostics,
                    &NoopProgress,
                )
            })
        });
    }
    group.finish();
}

fn bench_sectioning(c: &mut Criterion) {
    let dataset = network(100);
    let (points, _) = freightmatch::intersections::find_intersection_points(&dataset.routes, 1e-7);

    c.bench_function("section_100_routes", |b| {
        b.iter(|| {
            let mut diagnostics = freightmatch::Diagnostics::new();
            section_routes(
                black_box(&dataset.routes),
                &points,
                &mut diagnostics,
                &NoopProgress,
            )
        })
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");
    group.sample_size(10);

    for count in [25usize, 50, 100].iter() {
        let dataset = network(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &dataset, |b, data| {
            b.iter(|| run_engine(black_box(data)))
        });
    }
    group.finish();
}

fn bench_incremental_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_run");
    group.sample_size(10);

    let dataset = network(110);
    let (base, extra) = dataset.routes.split_at(100);

    for add_count in [1usize, 10].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(add_count),
            add_count,
            |b, &add_count| {
                b.iter_batched(
                    || {
                        let mut engine = ConsolidationEngine::new();
                        for route in base {
                            let _ = engine.add_route(route.clone());
                        }
                        engine.add_shipments(dataset.shipments.clone());
                        engine.run();
                        engine
                    },
                    |mut engine| {
                        for route in &extra[..add_count] {
                            let _ = engine.add_route(route.clone());
                        }
                        engine.run()
                    },
                    criterion::BatchSize::LargeInput,
                )
            },
        );
    }
    group.finish();
}

fn bench_freight_and_evaluation(c: &mut Criterion) {
    let dataset = network(100);
    let engine = run_engine(&dataset);
    let config = ConsolidationConfig::default();

    c.bench_function("freight_index_100_routes", |b| {
        b.iter(|| FreightIndex::build(black_box(&dataset.shipments), &config))
    });

    let evaluation_config = EvaluationConfig {
        pareto_front: true,
        ..EvaluationConfig::default()
    };
    c.bench_function("evaluate_with_pareto", |b| {
        b.iter(|| evaluate(black_box(engine.combinations().as_slice()), &evaluation_config))
    });
}

criterion_group!(
    benches,
    bench_pair_intersection,
    bench_intersection_scan,
    bench_sectioning,
    bench_full_pipeline,
    bench_incremental_run,
    bench_freight_and_evaluation,
);
criterion_main!(benches);
