//! Benchmarks for the envelope state machines.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polypatch::dsp::{Ad, Adsr};

use crate::BLOCK_SIZES;

const TIME_STEP: f32 = 1.0 / 48_000.0;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (ramping up)
        let mut env = Adsr::new(0.5, 0.1, 0.7, 0.3);
        group.bench_with_input(BenchmarkId::new("adsr_attack", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = env.step(black_box(1.0), TIME_STEP);
                }
                black_box(&mut buffer);
            })
        });

        // Sustain phase (holding steady)
        let mut env = Adsr::new(0.001, 0.001, 0.7, 0.3);
        for _ in 0..200 {
            env.step(1.0, TIME_STEP);
        }
        group.bench_with_input(BenchmarkId::new("adsr_sustain", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = env.step(black_box(1.0), TIME_STEP);
                }
                black_box(&mut buffer);
            })
        });

        // Idle (gate low, early return)
        let mut env = Adsr::new(0.001, 0.001, 0.7, 0.001);
        group.bench_with_input(BenchmarkId::new("adsr_idle", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = env.step(black_box(0.0), TIME_STEP);
                }
                black_box(&mut buffer);
            })
        });

        // Two-stage percussive envelope
        let mut env = Ad::new(0.01, 0.5);
        group.bench_with_input(BenchmarkId::new("ad", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = env.step(black_box(1.0), TIME_STEP);
                }
                black_box(&mut buffer);
            })
        });
    }

    group.finish();
}
