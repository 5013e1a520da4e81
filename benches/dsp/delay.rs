//! Benchmarks for delay line operations.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polypatch::dsp::{Delay, LocationUnit, Resolution};

use crate::BLOCK_SIZES;

const TIME_STEP: f32 = 1.0 / 48_000.0;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Plain recirculation with coefficient feedback
        let mut delay = Delay::with_length(0.25, LocationUnit::Seconds, TIME_STEP);
        delay.feedback = 0.5;
        group.bench_with_input(BenchmarkId::new("step", size), &size, |b, _| {
            b.iter(|| {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    *sample = delay.step(black_box(i as f32 * 0.001));
                }
                black_box(&mut buffer);
            })
        });

        // Feedback shaped by a closure, as a waveguide patch does
        let mut delay = Delay::with_length(0.01, LocationUnit::Seconds, TIME_STEP);
        group.bench_with_input(BenchmarkId::new("step_with", size), &size, |b, _| {
            b.iter(|| {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    *sample = delay.step_with(black_box(i as f32 * 0.001), |v| v * 0.99);
                }
                black_box(&mut buffer);
            })
        });

        // Reading taps between samples
        let delay = Delay::with_length(0.25, LocationUnit::Seconds, TIME_STEP);
        group.bench_with_input(BenchmarkId::new("tap_out", size), &size, |b, _| {
            b.iter(|| {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let phase = (i as f32) / (size as f32);
                    *sample = delay.tap_out(
                        black_box(phase),
                        LocationUnit::Phase,
                        Resolution::Interpolated,
                    );
                }
                black_box(&mut buffer);
            })
        });

        // Resizing, the crossfade being the expensive path
        group.bench_with_input(BenchmarkId::new("set_length", size), &size, |b, _| {
            let mut delay = Delay::with_length(0.25, LocationUnit::Seconds, TIME_STEP);
            let mut grow = true;
            b.iter(|| {
                let length = if grow { 0.3 } else { 0.25 };
                grow = !grow;
                delay.set_length(
                    black_box(length),
                    LocationUnit::Seconds,
                    Resolution::Interpolated,
                    TIME_STEP,
                );
            })
        });
    }

    group.finish();
}
