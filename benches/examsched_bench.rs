//! Criterion benchmarks for model building and solving.
//!
//! Uses synthetic sessions: `n` one- or two-slot exams spread over a few
//! cohorts, with rooms of two sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use u_examsched::schedule::{
    build_model, Exam, Room, ScheduleParams, ScheduleProblem, ScheduleRunner, SchedulerConfig,
};

fn session(n: usize) -> ScheduleProblem {
    let params = ScheduleParams::new(3, 8, 1).expect("valid params");
    let exams = (0..n)
        .map(|i| {
            let duration = 1 + (i % 2) as i64;
            let students = 10 + (i as i64 * 7) % 40;
            Exam::new(format!("E{i}"), duration, students).with_cohort((i % 3) as i64)
        })
        .collect();
    let rooms = vec![
        Room::new("Small", 30),
        Room::new("Medium", 30),
        Room::new("Amphi", 60),
    ];
    ScheduleProblem::new(params, exams, rooms).expect("valid problem")
}

// ===========================================================================
// Model construction
// ===========================================================================

fn bench_build_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_model");

    for &n in &[10, 40, 120] {
        let problem = session(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &problem, |b, p| {
            b.iter(|| build_model(black_box(p)).expect("model builds"));
        });
    }
    group.finish();
}

// ===========================================================================
// First feasible schedule
// ===========================================================================

fn bench_first_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_schedule");
    group.sample_size(10);

    let config = SchedulerConfig::default()
        .with_stop_after_first(true)
        .with_time_limit_ms(5_000);
    for &n in &[4, 8, 12] {
        let problem = session(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &problem, |b, p| {
            b.iter(|| ScheduleRunner::run(black_box(p), &config));
        });
    }
    group.finish();
}

// ===========================================================================
// Span minimization under a node budget
// ===========================================================================

fn bench_minimize_span(c: &mut Criterion) {
    let mut group = c.benchmark_group("minimize_span");
    group.sample_size(10);

    let config = SchedulerConfig::default().with_node_limit(20_000);
    for &n in &[3, 5] {
        let problem = session(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &problem, |b, p| {
            b.iter(|| ScheduleRunner::run(black_box(p), &config));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_build_model,
    bench_first_schedule,
    bench_minimize_span
);
criterion_main!(benches);
