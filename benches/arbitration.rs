//! Arbitration benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use plant_arbitrator::arbitration::relative_allocation;
use plant_arbitrator::config::{DriverParameters, Parameters};
use plant_arbitrator::state::CollectingSink;
use plant_arbitrator::BiomassPool;

fn bench_relative_allocation(c: &mut Criterion) {
    let demands: Vec<BiomassPool> = (0..32)
        .map(|i| BiomassPool {
            structural: 0.1 * i as f64,
            non_structural: 0.05 * i as f64,
            metabolic: 0.01,
        })
        .collect();

    c.bench_function("relative_allocation", |b| {
        b.iter(|| relative_allocation(black_box(&demands), black_box(12.0)))
    });
}

fn bench_run_day(c: &mut Criterion) {
    let params = Parameters::default();
    let drivers = DriverParameters::default();
    let template = params
        .build_simulation(Box::new(CollectingSink::default()))
        .expect("default crop builds");
    let organs = template.organs().to_vec();
    let zone = template.zone().clone();
    let arbitrator = plant_arbitrator::Arbitrator::default();

    c.bench_function("run_day", |b| {
        b.iter(|| {
            let mut organs = organs.clone();
            let mut zone = zone.clone();
            arbitrator.run_day(black_box(&mut organs), black_box(&mut zone), &drivers.for_day(10))
        })
    });

    c.bench_function("season_30_days", |b| {
        b.iter(|| {
            let mut organs = organs.clone();
            let mut zone = zone.clone();
            for day in 1..=30 {
                if arbitrator.run_day(&mut organs, &mut zone, &drivers.for_day(day)).is_err() {
                    break;
                }
            }
        })
    });
}

criterion_group!(benches, bench_relative_allocation, bench_run_day);
criterion_main!(benches);
