use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rewind_calibrate::simulation::{SimulatedChannel, SimulationModel, VirtualClock};
use rewind_calibrate::{analyze, Calibrator, Polarity};

fn sorted_class(seed: u64, lo: u64, hi: u64, n: usize) -> Vec<u64> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut v: Vec<u64> = (0..n).map(|_| rng.random_range(lo..hi)).collect();
    v.sort_unstable();
    v
}

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("threshold");

    // Default run size: one million samples per class
    let zero = sorted_class(1, 80, 140, 1_000_000);
    let one = sorted_class(2, 110, 200, 1_000_000);
    group.bench_function("analyze_1m", |b| {
        b.iter(|| black_box(analyze(black_box(&zero), black_box(&one), Polarity::OneSlower)));
    });

    group.sample_size(20);
    group.bench_function("simulated_run_10k", |b| {
        b.iter(|| {
            let clock = VirtualClock::new();
            let mut channel =
                SimulatedChannel::new(SimulationModel::default(), clock.clone(), 7);
            let report = Calibrator::quick()
                .trials(10_000)
                .run(&mut channel, clock)
                .map(|r| r.outcome.threshold());
            black_box(report)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_analysis);
criterion_main!(benches);
