use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use soxchain::audio::{peak_levels, sample_to_f32, Sample};

fn random_block(len: usize) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..len).map(|_| rng.r#gen::<Sample>()).collect()
}

fn bench_peak_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("peak_levels");
    for block_size in [1024, 8192, 65536] {
        let block = random_block(block_size);
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &block, |b, block| {
            b.iter(|| peak_levels(black_box(block), block_size))
        });
    }
    group.finish();
}

fn bench_sample_to_f32(c: &mut Criterion) {
    let block = random_block(8192);
    c.bench_function("sample_to_f32/8192", |b| {
        b.iter(|| {
            let mut clips = 0;
            let sum: f32 = block.iter().map(|&s| sample_to_f32(black_box(s), &mut clips)).sum();
            (sum, clips)
        })
    });
}

criterion_group!(benches, bench_peak_levels, bench_sample_to_f32);
criterion_main!(benches);
