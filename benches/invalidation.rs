//! Benchmarks for pattern invalidation over the in-memory store

use cache_analytics::{CacheAnalyticsBuilder, CacheAnalyticsSystem};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

fn seeded_system(rt: &Runtime, keys: usize) -> CacheAnalyticsSystem {
    rt.block_on(async {
        let system = CacheAnalyticsBuilder::new()
            .build()
            .await
            .unwrap_or_else(|_| panic!("Failed to create analytics system"));
        for i in 0..keys {
            let _ = system.accessor().set(&format!("session:{i}"), b"s", None).await;
            let _ = system.accessor().set(&format!("quote:{i}"), b"q", None).await;
        }
        system
    })
}

fn bench_delete_by_pattern(c: &mut Criterion) {
    let rt = Runtime::new().unwrap_or_else(|_| panic!("Failed to create runtime"));

    let mut group = c.benchmark_group("delete_by_pattern");
    for keys in &[100usize, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(keys), keys, |b, &keys| {
            b.iter_batched(
                || seeded_system(&rt, keys),
                |system| {
                    rt.block_on(async {
                        black_box(system.invalidation().delete_by_pattern("session:*").await.ok())
                    })
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_invalidate_single_key(c: &mut Criterion) {
    let rt = Runtime::new().unwrap_or_else(|_| panic!("Failed to create runtime"));
    let system = seeded_system(&rt, 0);

    c.bench_function("invalidate_single_key", |b| {
        b.iter(|| {
            rt.block_on(async {
                let key = format!("bench:inv:{}", rand::random::<u32>());
                let _ = system.accessor().set(&key, b"v", None).await;
                black_box(system.invalidation().invalidate(&key).await.ok())
            })
        });
    });
}

criterion_group!(benches, bench_delete_by_pattern, bench_invalidate_single_key);
criterion_main!(benches);
