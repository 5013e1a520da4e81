//! Benchmarks for oscillator waveform generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polypatch::dsp::oscillator::{Additive, Interpolated, Pulse, Saw, ShapePoint, Sine, Triangle};

use crate::BLOCK_SIZES;

const TIME_STEP: f32 = 1.0 / 48_000.0;
const FREQUENCY: f32 = 440.0;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Sine - uses sin() transcendental function
        let mut osc = Sine::new(FREQUENCY);
        group.bench_with_input(BenchmarkId::new("sine", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = osc.step(black_box(TIME_STEP));
                }
                black_box(&mut buffer);
            })
        });

        // Saw - simple linear ramp
        let mut osc = Saw::new(FREQUENCY);
        group.bench_with_input(BenchmarkId::new("saw", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = osc.step(black_box(TIME_STEP));
                }
                black_box(&mut buffer);
            })
        });

        // Pulse - branch per sample
        let mut osc = Pulse::new(FREQUENCY);
        group.bench_with_input(BenchmarkId::new("pulse", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = osc.step(black_box(TIME_STEP));
                }
                black_box(&mut buffer);
            })
        });

        // Triangle - piecewise linear
        let mut osc = Triangle::new(FREQUENCY);
        group.bench_with_input(BenchmarkId::new("triangle", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = osc.step(black_box(TIME_STEP));
                }
                black_box(&mut buffer);
            })
        });

        // Interpolated - point scan per sample
        let mut osc = Interpolated::new(FREQUENCY);
        osc.shape(&[
            ShapePoint::new(0.25, 1.0),
            ShapePoint::new(0.75, -1.0),
        ]);
        group.bench_with_input(BenchmarkId::new("interpolated", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = osc.step(black_box(TIME_STEP));
                }
                black_box(&mut buffer);
            })
        });

        // Additive - wavetable lookup (8 partials)
        let mut osc = Additive::new(8, FREQUENCY);
        group.bench_with_input(BenchmarkId::new("additive_8", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = osc.step(black_box(TIME_STEP));
                }
                black_box(&mut buffer);
            })
        });
    }

    group.finish();
}
