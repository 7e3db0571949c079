//! Benchmarks for the per-frame CPU work.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::DVec3;

use curlflow::{advance, CurlOperator, FlowParams, NoiseField, ParticleBuffer, SimplexNoise, VectorField};

fn bench_noise(c: &mut Criterion) {
    let mut group = c.benchmark_group("noise");

    group.bench_function("simplex_noise3", |b| {
        let noise = SimplexNoise::new(1);
        b.iter(|| black_box(noise.noise3(black_box(0.31), black_box(-1.2), black_box(4.7))))
    });

    group.bench_function("noise_field_sample", |b| {
        let field = NoiseField::new(1);
        let p = DVec3::new(0.31, -1.2, 4.7);
        b.iter(|| black_box(field.sample(black_box(p))))
    });

    group.bench_function("curl", |b| {
        let curl = CurlOperator::from_seed(1);
        b.iter(|| black_box(curl.curl(black_box(0.31), black_box(-1.2), black_box(4.7))))
    });

    group.finish();
}

fn bench_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("advance");
    let curl = CurlOperator::from_seed(7);
    let params = FlowParams {
        noise_scale: 0.1,
        flow_strength: 0.003,
        boundary_radius: 48.0,
    };

    for count in [1_000usize, 2_400, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut buffer = ParticleBuffer::new(count, 12.0, 7);
            b.iter(|| black_box(advance(&mut buffer, &curl, &params)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_noise, bench_advance);
criterion_main!(benches);
