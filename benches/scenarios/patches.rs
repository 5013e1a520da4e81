//! Benchmarks for single voices of each built-in patch.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polypatch::graph::StepCtx;
use polypatch::patches;
use polypatch::CV_COUNT;

use crate::BLOCK_SIZES;

const TIME_STEP: f32 = 1.0 / 48_000.0;

pub fn bench_patches(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/patches");
    let cv = [0.0f32; CV_COUNT];

    let factories: &[(&str, fn(f32) -> Box<dyn polypatch::patch::VoicePatch>)] = &[
        ("beep", patches::beep::voice),
        ("noise", patches::noise::voice),
        ("squiangle", patches::squiangle::voice),
        ("pwm-strings", patches::pwm_strings::voice),
        ("rough-fm-bass", patches::rough_fm_bass::voice),
        ("distorted-fifths", patches::distorted_fifths::voice),
        ("hammered-strings", patches::hammered_strings::voice),
    ];

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];
        for (name, factory) in factories {
            let mut voice = factory(TIME_STEP);
            let ctx = StepCtx {
                frequency: 110.0, // A2, typical bass note
                velocity: 1.0,
                cv: &cv,
            };
            group.bench_with_input(BenchmarkId::new(*name, size), &size, |b, _| {
                b.iter(|| {
                    for sample in buffer.iter_mut() {
                        *sample = voice.step(black_box(&ctx));
                    }
                    black_box(&mut buffer);
                })
            });
        }
    }

    group.finish();
}
