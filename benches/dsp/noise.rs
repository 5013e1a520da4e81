//! Benchmarks for the noise generators.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polypatch::dsp::{BrownNoise, PinkNoise, WhiteNoise};

use crate::BLOCK_SIZES;

pub fn bench_noise(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/noise");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // White - one PRNG draw per sample
        let mut noise = WhiteNoise::new();
        group.bench_with_input(BenchmarkId::new("white", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = noise.step();
                }
                black_box(&mut buffer);
            })
        });

        // Pink - octave register update per sample
        let mut noise = PinkNoise::new();
        group.bench_with_input(BenchmarkId::new("pink", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = noise.step();
                }
                black_box(&mut buffer);
            })
        });

        // Brown - rejection-sampled random walk
        let mut noise = BrownNoise::new();
        group.bench_with_input(BenchmarkId::new("brown", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = noise.step();
                }
                black_box(&mut buffer);
            })
        });
    }

    group.finish();
}
