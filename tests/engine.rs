//! End-to-end engine tests: event interleaving, allocation, and the
//! patch build lifecycle across the worker thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use polypatch::graph::StepCtx;
use polypatch::patch::{PatchBuilder, PatchSource, PatchUnit, VoicePatch};
use polypatch::synth::{note_to_frequency, Engine, EngineEvent, EventKind};
use polypatch::MAX_VOICES;

const SAMPLE_RATE: f32 = 48_000.0;

/// Each voice reports its velocity, which makes note routing visible in
/// the output.
struct VelocityPatch;

impl VoicePatch for VelocityPatch {
    fn step(&mut self, ctx: &StepCtx) -> f32 {
        ctx.velocity
    }
}

struct VelocityBuilder;

impl PatchBuilder for VelocityBuilder {
    fn build(&self, source: &PatchSource, _time_step: f32) -> PatchUnit {
        let voices = (0..MAX_VOICES)
            .map(|_| Box::new(VelocityPatch) as Box<dyn VoicePatch>)
            .collect();
        PatchUnit::new(source.clone(), voices)
    }
}

/// Flags a shared marker when dropped, to show where a retired patch dies.
struct DropSentinel {
    dropped: Arc<AtomicBool>,
}

impl VoicePatch for DropSentinel {
    fn step(&mut self, _ctx: &StepCtx) -> f32 {
        0.0
    }
}

impl Drop for DropSentinel {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

struct SentinelBuilder {
    dropped: Arc<AtomicBool>,
}

impl PatchBuilder for SentinelBuilder {
    fn build(&self, source: &PatchSource, _time_step: f32) -> PatchUnit {
        let voices = (0..1)
            .map(|_| {
                Box::new(DropSentinel {
                    dropped: self.dropped.clone(),
                }) as Box<dyn VoicePatch>
            })
            .collect();
        PatchUnit::new(source.clone(), voices)
    }
}

/// Builds only after receiving a token, so requests can pile up behind a
/// stalled build. Announces each build as it starts, and the "first" patch
/// carries the drop flag.
struct GatedBuilder {
    gate: Receiver<()>,
    started: std::sync::mpsc::Sender<String>,
    first_dropped: Arc<AtomicBool>,
}

impl PatchBuilder for GatedBuilder {
    fn build(&self, source: &PatchSource, _time_step: f32) -> PatchUnit {
        self.started.send(source.name.clone()).ok();
        self.gate.recv().ok();
        let voice: Box<dyn VoicePatch> = if source.name == "first" {
            Box::new(DropSentinel {
                dropped: self.first_dropped.clone(),
            })
        } else {
            Box::new(VelocityPatch)
        };
        PatchUnit::new(source.clone(), vec![voice])
    }
}

/// Render empty buffers until the named patch is installed.
fn wait_for_patch(engine: &mut Engine, name: &str) {
    let mut scratch = [0.0f32; 64];
    for _ in 0..1000 {
        engine.render(&mut scratch);
        if engine.patch_name() == Some(name) {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("patch {name} never arrived");
}

#[test]
fn renders_silence_without_a_patch() {
    let mut engine = Engine::new(SAMPLE_RATE, VelocityBuilder);
    engine.handle_event(EngineEvent::new(0, EventKind::NoteOn { note: 60, velocity: 127 }));
    let mut out = [1.0f32; 256];
    engine.render(&mut out);
    assert!(out.iter().all(|&s| s == 0.0));
}

#[test]
fn event_lands_on_its_exact_frame() {
    let mut engine = Engine::new(SAMPLE_RATE, VelocityBuilder);
    assert!(engine.request_patch_build("test"));
    wait_for_patch(&mut engine, "test");

    engine.handle_event(EngineEvent::new(0, EventKind::SetPolyphony { voices: 1 }));
    engine.handle_event(EngineEvent::new(
        128,
        EventKind::NoteOn { note: 60, velocity: 127 },
    ));
    let mut out = [0.0f32; 256];
    engine.render(&mut out);
    assert!(out[..128].iter().all(|&s| s == 0.0));
    assert!(out[128..].iter().all(|&s| s == 1.0));
}

#[test]
fn event_past_the_buffer_fires_at_the_end() {
    let mut engine = Engine::new(SAMPLE_RATE, VelocityBuilder);
    assert!(engine.request_patch_build("test"));
    wait_for_patch(&mut engine, "test");

    engine.handle_event(EngineEvent::new(0, EventKind::SetPolyphony { voices: 1 }));
    engine.handle_event(EngineEvent::new(
        9999,
        EventKind::NoteOn { note: 60, velocity: 127 },
    ));
    let mut out = [0.0f32; 64];
    engine.render(&mut out);
    assert!(out.iter().all(|&s| s == 0.0));
    // the note was applied after the last frame, so the next buffer sounds
    engine.render(&mut out);
    assert!(out.iter().all(|&s| s == 1.0));
}

#[test]
fn notes_spread_across_the_polyphony_limit() {
    let mut engine = Engine::new(SAMPLE_RATE, VelocityBuilder);
    assert!(engine.request_patch_build("test"));
    wait_for_patch(&mut engine, "test");

    engine.handle_event(EngineEvent::new(0, EventKind::SetPolyphony { voices: 2 }));
    engine.handle_event(EngineEvent::new(0, EventKind::NoteOn { note: 60, velocity: 127 }));
    engine.handle_event(EngineEvent::new(0, EventKind::NoteOn { note: 62, velocity: 64 }));
    let mut out = [0.0f32; 32];
    engine.render(&mut out);

    assert_eq!(engine.voice(0).map(|v| v.note), Some(Some(60)));
    assert_eq!(engine.voice(1).map(|v| v.note), Some(Some(62)));
    // a third note steals the least recently allocated slot
    engine.handle_event(EngineEvent::new(0, EventKind::NoteOn { note: 64, velocity: 127 }));
    engine.render(&mut out);
    assert_eq!(engine.voice(0).map(|v| v.note), Some(Some(64)));
    assert_eq!(engine.voice(1).map(|v| v.note), Some(Some(62)));
}

#[test]
fn note_off_silences_without_freeing_state() {
    let mut engine = Engine::new(SAMPLE_RATE, VelocityBuilder);
    assert!(engine.request_patch_build("test"));
    wait_for_patch(&mut engine, "test");

    engine.handle_event(EngineEvent::new(0, EventKind::SetPolyphony { voices: 1 }));
    engine.handle_event(EngineEvent::new(0, EventKind::NoteOn { note: 60, velocity: 127 }));
    let mut out = [0.0f32; 32];
    engine.render(&mut out);
    assert!(out.iter().all(|&s| s == 1.0));

    engine.handle_event(EngineEvent::new(0, EventKind::NoteOff { note: 60 }));
    engine.render(&mut out);
    assert!(out.iter().all(|&s| s == 0.0));
    // the slot still remembers its note for the patch's release tail
    assert_eq!(engine.voice(0).map(|v| v.note), Some(Some(60)));
}

#[test]
fn pitch_bend_retunes_sounding_voices() {
    let mut engine = Engine::new(SAMPLE_RATE, VelocityBuilder);
    assert!(engine.request_patch_build("test"));
    wait_for_patch(&mut engine, "test");

    engine.handle_event(EngineEvent::new(0, EventKind::NoteOn { note: 69, velocity: 127 }));
    let mut out = [0.0f32; 32];
    engine.render(&mut out);
    let base = engine.voice(0).map(|v| v.frequency);
    assert_eq!(base, Some(440.0));

    // full bend at the default two-semitone range
    engine.handle_event(EngineEvent::new(0, EventKind::PitchBend { value: 0x3FFF }));
    engine.render(&mut out);
    let bent = engine.voice(0).map(|v| v.frequency);
    assert_eq!(bent, Some(note_to_frequency(71.0)));

    // widening the range re-applies the current bend
    engine.handle_event(EngineEvent::new(0, EventKind::SetBendRange { semitones: 12.0 }));
    engine.render(&mut out);
    assert_eq!(
        engine.voice(0).map(|v| v.frequency),
        Some(note_to_frequency(81.0))
    );
}

#[test]
fn controller_values_reach_the_voices() {
    let mut engine = Engine::new(SAMPLE_RATE, VelocityBuilder);
    engine.handle_event(EngineEvent::new(
        0,
        EventKind::Controller { controller: 1, value: 127 },
    ));
    let mut out = [0.0f32; 16];
    engine.render(&mut out);
    assert_eq!(engine.controller(1), 1.0);
    assert_eq!(engine.controller(0), 0.0);
}

#[test]
fn failed_build_keeps_the_current_patch() {
    let mut engine = Engine::new(SAMPLE_RATE, polypatch::patch::PatchLibrary::with_builtins());
    assert!(engine.request_patch_build("beep"));
    wait_for_patch(&mut engine, "beep");

    assert!(engine.request_patch_build("no-such-patch"));
    let mut scratch = [0.0f32; 64];
    for _ in 0..1000 {
        engine.render(&mut scratch);
        if engine.last_build_failure().is_some() {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    let failure = engine.last_build_failure();
    assert!(failure.is_some_and(|f| f.source.name == "no-such-patch"));
    assert_eq!(engine.patch_name(), Some("beep"));
}

#[test]
fn replaced_patch_is_dropped_off_the_render_path() {
    let dropped = Arc::new(AtomicBool::new(false));
    let mut engine = Engine::new(
        SAMPLE_RATE,
        SentinelBuilder {
            dropped: dropped.clone(),
        },
    );
    assert!(engine.request_patch_build("first"));
    wait_for_patch(&mut engine, "first");
    assert!(!dropped.load(Ordering::SeqCst));

    assert!(engine.request_patch_build("second"));
    wait_for_patch(&mut engine, "second");
    // the retired unit crosses back to the worker and dies there
    let mut scratch = [0.0f32; 64];
    for _ in 0..1000 {
        if dropped.load(Ordering::SeqCst) {
            break;
        }
        engine.render(&mut scratch);
        thread::sleep(Duration::from_millis(1));
    }
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn retired_patch_waits_out_a_full_request_ring() {
    let (tokens, gate) = std::sync::mpsc::channel();
    let (started_tx, started) = std::sync::mpsc::channel();
    let first_dropped = Arc::new(AtomicBool::new(false));
    let mut engine = Engine::new(
        SAMPLE_RATE,
        GatedBuilder {
            gate,
            started: started_tx,
            first_dropped: first_dropped.clone(),
        },
    );
    let wait_started = |started: &Receiver<String>, name: &str| {
        let next = started.recv_timeout(Duration::from_secs(5)).ok();
        assert_eq!(next.as_deref(), Some(name));
    };

    tokens.send(()).ok();
    assert!(engine.request_patch_build("first"));
    wait_for_patch(&mut engine, "first");
    wait_started(&started, "first");

    // "second" builds right away; its finished unit sits in the response
    // ring while the tokenless "stall" build wedges the worker.
    tokens.send(()).ok();
    assert!(engine.request_patch_build("second"));
    assert!(engine.request_patch_build("stall"));
    wait_started(&started, "second");
    wait_started(&started, "stall");
    // With the worker wedged, requests accumulate until the ring is full.
    for _ in 0..32 {
        if !engine.request_patch_build("queued") {
            break;
        }
    }
    assert!(!engine.request_patch_build("queued"));

    // Installing "second" retires "first", which cannot cross the full
    // ring yet; it must be held, not freed on the render path.
    let mut scratch = [0.0f32; 64];
    engine.render(&mut scratch);
    assert_eq!(engine.patch_name(), Some("second"));
    assert!(!first_dropped.load(Ordering::SeqCst));

    // Unblocking the worker drains the backlog and the held unit finally
    // crosses over to be dropped there.
    for _ in 0..64 {
        tokens.send(()).ok();
    }
    for _ in 0..1000 {
        engine.render(&mut scratch);
        if first_dropped.load(Ordering::SeqCst) {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    assert!(first_dropped.load(Ordering::SeqCst));
}

#[cfg(feature = "serde")]
mod snapshots {
    use super::*;
    use polypatch::patch::PatchLibrary;

    #[test]
    fn snapshot_keeps_only_touched_controllers() {
        let mut engine = Engine::new(SAMPLE_RATE, PatchLibrary::with_builtins());
        engine.set_polyphony(4);
        engine.set_bend_range(12.0);
        engine.set_control_value(5, 0.5);
        engine.set_control_value(119, 1.0);
        let shot = engine.snapshot();
        assert_eq!(shot.polyphony, 4);
        assert_eq!(shot.bend_range, 12.0);
        assert_eq!(shot.cv, vec![(5, 0.5), (119, 1.0)]);
        assert!(shot.patch.is_none());
    }

    #[test]
    fn restore_rebuilds_the_patch_and_control_state() {
        let mut engine = Engine::new(SAMPLE_RATE, PatchLibrary::with_builtins());
        assert!(engine.request_patch_build("beep"));
        wait_for_patch(&mut engine, "beep");
        engine.set_polyphony(2);
        engine.set_bend_range(3.0);
        engine.set_control_value(3, 0.75);
        let shot = engine.snapshot();

        let mut other = Engine::new(SAMPLE_RATE, PatchLibrary::with_builtins());
        // stale state the snapshot never saw must be wiped
        other.set_control_value(9, 1.0);
        other.restore(&shot);
        wait_for_patch(&mut other, "beep");
        assert_eq!(other.polyphony(), 2);
        assert_eq!(other.controller(3), 0.75);
        assert_eq!(other.controller(9), 0.0);

        let again = other.snapshot();
        assert_eq!(again.bend_range, 3.0);
        assert_eq!(again.patch.as_ref().map(|p| p.name.as_str()), Some("beep"));
    }

    #[test]
    fn state_request_is_cleared_by_snapshot() {
        let mut engine = Engine::new(SAMPLE_RATE, PatchLibrary::with_builtins());
        assert!(!engine.sync_requested());
        engine.handle_event(EngineEvent::new(0, EventKind::StateRequest));
        let mut out = [0.0f32; 16];
        engine.render(&mut out);
        assert!(engine.sync_requested());
        engine.snapshot();
        assert!(!engine.sync_requested());
    }
}
