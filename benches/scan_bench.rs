use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use marquee::vector::core::distance::DistanceMetric;
use marquee::vector::{Embedding, Include, VectorStore, VectorStoreConfig};

fn generate_test_vectors(count: usize, dimension: usize, seed: u64) -> Vec<Embedding> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            Embedding::new(
                (0..dimension)
                    .map(|_| rng.random_range(-1.0f32..1.0))
                    .collect(),
            )
        })
        .collect()
}

fn build_store(count: usize, dimension: usize, parallel_threshold: usize) -> VectorStore {
    let store = VectorStore::in_memory(
        VectorStoreConfig::new("bench").with_parallel_threshold(parallel_threshold),
        None,
    )
    .unwrap();
    store
        .insert(
            (0..count as u64).collect::<Vec<_>>(),
            generate_test_vectors(count, dimension, 42),
            None,
        )
        .unwrap();
    store
}

fn bench_distances(c: &mut Criterion) {
    let dimension = 384;
    let vectors = generate_test_vectors(101, dimension, 7);
    let query = vectors[0].as_slice();
    let targets = &vectors[1..];

    let mut group = c.benchmark_group("distance_metrics");
    for metric in [
        DistanceMetric::SquaredEuclidean,
        DistanceMetric::Euclidean,
        DistanceMetric::Cosine,
        DistanceMetric::InnerProduct,
    ] {
        group.bench_function(metric.name(), |b| {
            b.iter(|| {
                for target in targets {
                    let _ = black_box(
                        metric
                            .distance(black_box(query), black_box(target.as_slice()))
                            .unwrap(),
                    );
                }
            })
        });
    }
    group.finish();
}

fn bench_knn_scan(c: &mut Criterion) {
    let dimension = 384;
    let queries = generate_test_vectors(1, dimension, 99);

    let mut group = c.benchmark_group("knn_scan");
    group.sample_size(20);
    for count in [1_000usize, 10_000, 50_000] {
        for (label, threshold) in [("serial", usize::MAX), ("parallel", 1024)] {
            let store = build_store(count, dimension, threshold);
            group.bench_with_input(BenchmarkId::new(label, count), &count, |b, _| {
                b.iter(|| {
                    black_box(
                        store
                            .query(black_box(&queries), 10, Include::distances_only())
                            .unwrap(),
                    )
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_distances, bench_knn_scan);
criterion_main!(benches);
