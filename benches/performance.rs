//! Performance benchmarks for the network speed tester
//!
//! The reducer runs once per direction per test, but the sampler hands it
//! every chunk it measured, so it is benchmarked across window sizes.

use clap::Parser;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use network_speed_tester::{
    cli::Cli,
    executor::ProgressSplit,
    models::{SampleWindow, TestResult},
    output::OutputFormatterFactory,
    stats::{reduce, reduce_with, trimmed_mean, ReducerPolicy, WindowSummary},
    types::{Direction, TestPhase},
};
use std::hint::black_box;
use uuid::Uuid;

/// Throughput readings with a slow start and an occasional spike
fn create_sample_values(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let ramp = (i as f64 / 4.0).min(1.0);
            let spike = if i % 17 == 0 { 400.0 } else { 0.0 };
            90.0 * ramp + (i % 7) as f64 + spike
        })
        .collect()
}

fn benchmark_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce");

    for size in [5usize, 20, 100, 1000] {
        let window = SampleWindow::from_values(Direction::Download, &create_sample_values(size));

        group.bench_with_input(BenchmarkId::new("default_policy", size), &window, |b, window| {
            b.iter(|| black_box(reduce(black_box(window))));
        });

        let aggressive = ReducerPolicy::new(3, 0.25).unwrap();
        group.bench_with_input(BenchmarkId::new("quarter_trim", size), &window, |b, window| {
            b.iter(|| black_box(reduce_with(black_box(window), &aggressive)));
        });
    }

    group.finish();
}

fn benchmark_trimmed_mean(c: &mut Criterion) {
    let mut group = c.benchmark_group("trimmed_mean");
    let policy = ReducerPolicy::default();

    for size in [10usize, 500] {
        let values = create_sample_values(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &values, |b, values| {
            b.iter(|| black_box(trimmed_mean(black_box(values), &policy)));
        });
    }

    let window = SampleWindow::from_values(Direction::Upload, &create_sample_values(200));
    group.bench_function("window_summary_200", |b| {
        b.iter(|| black_box(WindowSummary::from_window(black_box(&window), &policy)));
    });

    group.finish();
}

fn benchmark_progress(c: &mut Criterion) {
    let split = ProgressSplit::default();

    c.bench_function("progress_percent", |b| {
        b.iter(|| {
            for phase in [TestPhase::Ping, TestPhase::Download, TestPhase::Upload] {
                for step in 0..=10 {
                    black_box(split.percent(phase, step as f64 / 10.0));
                }
            }
        });
    });
}

fn benchmark_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("output");
    let result = TestResult::new(Uuid::new_v4(), "https://speed.example.net", 512.3, 48.7, 14.2, 1.3);

    for (name, color, json) in [("plain", false, false), ("colored", true, false), ("json", false, true)] {
        let formatter = OutputFormatterFactory::create_formatter(color, json);
        group.bench_function(name, |b| {
            b.iter(|| black_box(formatter.format_result(black_box(&result)).unwrap()));
        });
    }

    group.bench_function("parse_cli_args", |b| {
        let args = [
            "nst",
            "--server", "https://speed.example.net",
            "--ping-count", "5",
            "--download-duration-ms", "5000",
            "--json",
        ];
        b.iter(|| black_box(Cli::try_parse_from(black_box(args)).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_reduce,
    benchmark_trimmed_mean,
    benchmark_progress,
    benchmark_output
);
criterion_main!(benches);
