//! Performance benchmarks for ride_core using Criterion.rs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ride_core::matching::{MatchingAlgorithm, NearestFirst};
use ride_core::model::Trip;
use ride_core::spatial::{H3LocationIndex, LocationIndex};
use ride_core::test_helpers::{offset_east, offset_north, test_origin, trip_request};
use tokio::runtime::{Builder, Runtime};

fn runtime() -> Runtime {
    Builder::new_current_thread()
        .build()
        .expect("benchmark runtime")
}

/// Captains scattered uniformly over a square `spread_m` on a side around the origin.
fn seeded_index(rt: &Runtime, captains: usize, spread_m: f64) -> H3LocationIndex {
    let index = H3LocationIndex::default();
    let mut rng = StdRng::seed_from_u64(42);
    rt.block_on(async {
        for i in 0..captains {
            let north = rng.gen_range(-spread_m / 2.0..spread_m / 2.0);
            let east = rng.gen_range(-spread_m / 2.0..spread_m / 2.0);
            let at = offset_east(offset_north(test_origin(), north), east);
            index
                .upsert_location(&format!("captain-{i}"), at)
                .await
                .expect("upsert");
        }
    });
    index
}

fn bench_query_nearby(c: &mut Criterion) {
    let rt = runtime();
    let fleets = vec![("small", 1_000), ("medium", 10_000), ("large", 50_000)];

    let mut group = c.benchmark_group("query_nearby");
    for (name, captains) in fleets {
        let index = seeded_index(&rt, captains, 20_000.0);
        group.bench_with_input(BenchmarkId::from_parameter(name), &index, |b, index| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(
                        index
                            .query_nearby(test_origin(), 2_000.0, 10)
                            .await
                            .expect("query"),
                    )
                })
            });
        });
    }
    group.finish();
}

fn bench_query_radius(c: &mut Criterion) {
    let rt = runtime();
    let index = seeded_index(&rt, 10_000, 20_000.0);

    let mut group = c.benchmark_group("query_radius");
    for radius_m in [500.0, 2_000.0, 8_000.0] {
        group.bench_with_input(
            BenchmarkId::from_parameter(radius_m as u64),
            &radius_m,
            |b, &radius_m| {
                b.iter(|| {
                    rt.block_on(async {
                        black_box(
                            index
                                .query_nearby(test_origin(), radius_m, 10)
                                .await
                                .expect("query"),
                        )
                    })
                });
            },
        );
    }
    group.finish();
}

fn bench_rank_candidates(c: &mut Criterion) {
    let rt = runtime();
    let index = seeded_index(&rt, 10_000, 4_000.0);
    let nearby = rt
        .block_on(index.query_nearby(test_origin(), 2_000.0, 200))
        .expect("query");
    let trip = Trip::requested("rider", trip_request(test_origin(), 1), 0.0, "0000".into());

    c.bench_function("rank_nearest_first", |b| {
        b.iter(|| black_box(NearestFirst.rank(&trip, nearby.clone())));
    });
}

criterion_group!(
    benches,
    bench_query_nearby,
    bench_query_radius,
    bench_rank_candidates
);
criterion_main!(benches);
