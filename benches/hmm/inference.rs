use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use loghmm::hmm::{batch, init};
use loghmm::{baum_welch, forward, viterbi, BaumWelchConfig, HiddenMarkovModel};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn model(num_states: usize, num_symbols: usize) -> HiddenMarkovModel<usize, usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    init::random(0..num_states, 0..num_symbols, &mut rng).unwrap()
}

fn observations(len: usize, num_symbols: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(0..num_symbols)).collect()
}

fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward");
    let model = model(16, 32);
    for len in [100, 1_000, 10_000] {
        let obs = observations(len, 32, 7);
        group.bench_with_input(BenchmarkId::from_parameter(len), &obs, |b, obs| {
            b.iter(|| forward(black_box(&model), black_box(obs)))
        });
    }
    group.finish();
}

fn bench_viterbi(c: &mut Criterion) {
    let mut group = c.benchmark_group("viterbi");
    let model = model(16, 32);
    for len in [100, 1_000, 10_000] {
        let obs = observations(len, 32, 7);
        group.bench_with_input(BenchmarkId::from_parameter(len), &obs, |b, obs| {
            b.iter(|| viterbi(black_box(&model), black_box(obs)))
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let model = model(8, 16);
    let data: Vec<Vec<usize>> = (0..256).map(|seed| observations(200, 16, seed)).collect();
    c.bench_function("likelihoods_256x200", |b| {
        b.iter(|| batch::likelihoods(black_box(&model), black_box(&data)))
    });
}

fn bench_baum_welch(c: &mut Criterion) {
    let model = model(4, 8);
    let data: Vec<Vec<usize>> = (0..32).map(|seed| observations(50, 8, seed)).collect();
    let config = BaumWelchConfig {
        max_iterations: 5,
        tolerance: 0.0,
    };
    c.bench_function("baum_welch_5_iterations", |b| {
        b.iter(|| baum_welch(black_box(&model), black_box(&data), &config).unwrap())
    });
}

criterion_group!(benches, bench_forward, bench_viterbi, bench_batch, bench_baum_welch);
criterion_main!(benches);
