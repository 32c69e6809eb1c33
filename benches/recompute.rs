//! 整批重算效能基準

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rccp_calc::CapacityPlanner;
use rccp_core::{DemandSource, PlanningPeriod, PlanningPolicy, WorkCenter};
use rust_decimal::Decimal;

const WEEKS: u32 = 12;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 3).unwrap()
}

fn work_centers(count: usize, rng: &mut StdRng) -> Vec<WorkCenter> {
    (0..count)
        .map(|i| {
            WorkCenter::new(format!("WC-{:03}", i), format!("工作中心 {}", i), "製造".to_string())
                .with_machines(rng.gen_range(1..=8))
                .with_shifts_per_day(rng.gen_range(1..=3))
                .with_hours_per_shift(Decimal::from(8))
                .with_working_days_per_week(Decimal::from(rng.gen_range(5..=6)))
                .with_efficiency_factor(Decimal::new(rng.gen_range(70..=100), 2))
        })
        .collect()
}

fn demands(count: usize, centers: usize, rng: &mut StdRng) -> Vec<DemandSource> {
    let horizon_days = i64::from(WEEKS) * 7;
    (0..count)
        .map(|i| {
            let offset = rng.gen_range(0..horizon_days - 14);
            let span = rng.gen_range(0..14);
            let begin = start() + Duration::days(offset);
            DemandSource::new(
                format!("WO-{:06}", i),
                format!("WC-{:03}", rng.gen_range(0..centers)),
                Decimal::new(rng.gen_range(10..4_000), 1),
                begin,
                begin + Duration::days(span),
            )
        })
        .collect()
}

fn bench_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("recompute");

    for (centers, orders) in [(10, 1_000), (50, 10_000), (200, 50_000)] {
        let mut rng = StdRng::seed_from_u64(42);
        let planner = CapacityPlanner::new(work_centers(centers, &mut rng), PlanningPolicy::default())
            .unwrap();
        let demands = demands(orders, centers, &mut rng);
        let horizon = PlanningPeriod::weekly_horizon(start(), WEEKS);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}wc_{}wo", centers, orders)),
            &demands,
            |b, demands| {
                b.iter(|| planner.run(black_box(horizon.clone()), black_box(demands)).unwrap())
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_recompute);
criterion_main!(benches);
