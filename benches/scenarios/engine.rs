//! Benchmarks for the full polyphonic engine.

use std::hint::black_box;
use std::thread;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion};
use polypatch::patch::PatchLibrary;
use polypatch::synth::{Engine, EngineEvent, EventKind};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

fn engine_with(patch: &str, polyphony: u8, held_notes: &[u8]) -> Engine {
    let mut engine = Engine::new(SAMPLE_RATE, PatchLibrary::with_builtins());
    engine.request_patch_build(patch);
    let mut scratch = [0.0f32; 64];
    while engine.patch_name() != Some(patch) {
        engine.render(&mut scratch);
        thread::sleep(Duration::from_millis(1));
    }
    engine.handle_event(EngineEvent::new(0, EventKind::SetPolyphony { voices: polyphony }));
    for (i, &note) in held_notes.iter().enumerate() {
        engine.handle_event(EngineEvent::new(
            i as u32,
            EventKind::NoteOn { note, velocity: 100 },
        ));
    }
    engine.render(&mut scratch);
    engine
}

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // One held note on a light patch
        let mut engine = engine_with("beep", 8, &[60]);
        group.bench_with_input(BenchmarkId::new("beep_1_of_8", size), &size, |b, _| {
            b.iter(|| {
                engine.render(black_box(&mut buffer));
            })
        });

        // A four-note chord on the heaviest built-in patch
        let mut engine = engine_with("hammered-strings", 8, &[48, 55, 60, 64]);
        group.bench_with_input(
            BenchmarkId::new("hammered_chord_of_8", size),
            &size,
            |b, _| {
                b.iter(|| {
                    engine.render(black_box(&mut buffer));
                })
            },
        );

        // Full polyphony, every slot sounding
        let notes: Vec<u8> = (36..100).collect();
        let mut engine = engine_with("squiangle", 64, &notes);
        group.bench_with_input(BenchmarkId::new("squiangle_64_voices", size), &size, |b, _| {
            b.iter(|| {
                engine.render(black_box(&mut buffer));
            })
        });

        // Event-heavy render: a note on and off every 32 frames
        let mut engine = engine_with("beep", 8, &[]);
        group.bench_with_input(BenchmarkId::new("beep_event_storm", size), &size, |b, _| {
            b.iter(|| {
                for (i, frame) in (0..size as u32).step_by(32).enumerate() {
                    let note = 48 + (i as u8 % 24);
                    engine.handle_event(EngineEvent::new(frame, EventKind::NoteOn { note, velocity: 100 }));
                    engine.handle_event(EngineEvent::new(frame + 16, EventKind::NoteOff { note }));
                }
                engine.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
