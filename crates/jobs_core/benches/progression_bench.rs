//! Criterion micro-benchmarks for the progression core.
//!
//! Benchmarks:
//! - Single experience grant without a level change
//! - Large grant cascading through many levels
//! - Leaderboard upsert and top-N reads on a populated board

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};

use jobs_core::{
    CurveSpec, DenyAll, FixedClock, Job, JobId, JobsConfig, JobsService, PlayerId, RankPublisher,
    RankSnapshot, TopListAggregator,
};

fn service(players: usize) -> (JobsService<DenyAll, FixedClock>, Vec<PlayerId>) {
    let config = JobsConfig::default().with_jobs([Job::new("miner", "Miner")
        .with_max_level(500)
        .with_curve(CurveSpec::Linear { base: 100, per_level: 25 })]);
    let mut svc = JobsService::new(config, DenyAll, FixedClock(0)).unwrap();
    let miner = JobId::new("miner");

    let ids: Vec<PlayerId> = (0..players).map(|_| PlayerId::new_v4()).collect();
    for id in &ids {
        svc.register_player(id.clone(), "bench").unwrap();
        svc.join_job(id, &miner, None).unwrap();
    }
    (svc, ids)
}

fn bench_add_experience(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_experience");
    let miner = JobId::new("miner");

    group.bench_function("no_level_change", |b| {
        let (mut svc, ids) = service(1);
        b.iter(|| {
            svc.add_experience(&ids[0], &miner, black_box(0.0)).unwrap();
        });
    });

    for levels in [10u32, 100, 400] {
        // Sum of thresholds for levels 1..=levels
        let total: i64 = (1..=levels as i64).map(|l| 100 + 25 * (l - 1)).sum();
        group.bench_with_input(BenchmarkId::new("cascade", levels), &total, |b, &total| {
            b.iter_batched(
                || service(1),
                |(mut svc, ids)| {
                    svc.add_experience(&ids[0], &miner, black_box(total as f64)).unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_leaderboard(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaderboard");
    let miner = JobId::new("miner");

    for players in [100usize, 10_000] {
        let mut board = TopListAggregator::new();
        let ids: Vec<PlayerId> = (0..players).map(|_| PlayerId::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            board
                .publish(&RankSnapshot {
                    job: miner.clone(),
                    player: id.clone(),
                    level: (i % 200) as u32 + 1,
                    experience: (i % 97) as f64,
                    revision: 1,
                })
                .unwrap();
        }

        group.throughput(Throughput::Elements(1));
        let mut revision = 1u64;
        group.bench_with_input(BenchmarkId::new("upsert", players), &ids, |b, ids| {
            b.iter(|| {
                revision += 1;
                let snapshot = RankSnapshot {
                    job: miner.clone(),
                    player: ids[(revision as usize) % ids.len()].clone(),
                    level: (revision % 200) as u32 + 1,
                    experience: 0.0,
                    revision,
                };
                black_box(board.upsert(&snapshot));
            });
        });

        group.bench_with_input(BenchmarkId::new("top_10", players), &miner, |b, miner| {
            b.iter(|| black_box(board.top(miner, 10)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add_experience, bench_leaderboard);
criterion_main!(benches);
