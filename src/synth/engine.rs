use std::mem;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rtrb::{Consumer, Producer};

use super::event::{bend_amount, EngineEvent, EventKind};
use super::voice::VoicePool;
use super::worker::{self, WorkRequest, WorkResponse};
use crate::graph::StepCtx;
use crate::patch::{BuildFailure, PatchBuilder, PatchSource, PatchUnit};
use crate::{ControlValues, CV_COUNT};

/// Most events a single render call will honor; extras are dropped.
const MAX_PENDING_EVENTS: usize = 1024;

/// How many retired patch units can wait for the worker to take them.
const MAX_RETIRED: usize = 4;

const DEFAULT_BEND_RANGE: f32 = 2.0;

/*
 * Threading
 * =========
 *
 *   control thread          audio thread              worker thread
 *   --------------          ------------              -------------
 *   handle_event -------->  render:                   build requests
 *   request_patch_build --    drain responses  <----  built units
 *                             interleave events
 *                             sum voices
 *                             retire old unit  ---->  dropped here
 *
 * The audio-thread half never allocates or frees: events land in a
 * preallocated queue, built units arrive whole over a ring, and retired
 * units leave the same way to be dropped by the worker.
 */

/// The polyphonic render engine.
///
/// Owns the voice pool, the shared controller values, and the currently
/// loaded patch. Everything happens inside [`Engine::render`], which the
/// caller invokes once per audio buffer.
pub struct Engine {
    time_step: f32,
    pool: VoicePool,
    patch: Option<PatchUnit>,
    cv: ControlValues,
    bend: f32,
    bend_range: f32,
    events: Vec<EngineEvent>,
    requests: Producer<WorkRequest>,
    responses: Consumer<WorkResponse>,
    retired: Vec<PatchUnit>,
    last_failure: Option<BuildFailure>,
    sync_requested: bool,
}

impl Engine {
    /// Create an engine and start its build worker.
    pub fn new(sample_rate: f32, builder: impl PatchBuilder + 'static) -> Self {
        let (requests, responses) = worker::spawn(builder);
        Self {
            time_step: 1.0 / sample_rate,
            pool: VoicePool::new(),
            patch: None,
            cv: [0.0; CV_COUNT],
            bend: 0.0,
            bend_range: DEFAULT_BEND_RANGE,
            events: Vec::with_capacity(MAX_PENDING_EVENTS),
            requests,
            responses,
            retired: Vec::with_capacity(MAX_RETIRED),
            last_failure: None,
            sync_requested: false,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        1.0 / self.time_step
    }

    /// Change the sample rate. The installed patch was built for the old
    /// step time, so a rebuild at the new rate is requested; it keeps
    /// playing (detuned) until the replacement arrives.
    pub fn configure(&mut self, sample_rate: f32) {
        self.time_step = 1.0 / sample_rate;
        if let Some(name) = self.patch_name().map(String::from) {
            self.request_patch_build(&name);
        }
    }

    pub fn set_polyphony(&mut self, voices: usize) {
        self.pool.set_polyphony(voices);
    }

    pub fn set_bend_range(&mut self, semitones: f32) {
        self.bend_range = semitones;
        self.pool.apply_bend(self.bend * self.bend_range);
    }

    /// Set one controller value. Out-of-range indices are ignored, values
    /// clamp to 0.0..1.0.
    pub fn set_control_value(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.cv.get_mut(index) {
            *slot = value.clamp(0.0, 1.0);
        }
    }

    pub fn set_control_values(&mut self, values: &[(usize, f32)]) {
        for &(index, value) in values {
            self.set_control_value(index, value);
        }
    }

    pub fn polyphony(&self) -> usize {
        self.pool.polyphony()
    }

    pub fn voice(&self, index: usize) -> Option<&super::voice::Voice> {
        self.pool.voice(index)
    }

    pub fn patch_name(&self) -> Option<&str> {
        self.patch.as_ref().map(|unit| unit.source.name.as_str())
    }

    pub fn controller(&self, index: usize) -> f32 {
        self.cv.get(index).copied().unwrap_or(0.0)
    }

    /// The most recently rejected build, if any. Cleared when a later
    /// build succeeds.
    pub fn last_build_failure(&self) -> Option<&BuildFailure> {
        self.last_failure.as_ref()
    }

    /// Whether a state snapshot has been requested since the last
    /// [`Engine::snapshot`].
    pub fn sync_requested(&self) -> bool {
        self.sync_requested
    }

    /// Ask the worker to build a patch. The current patch keeps playing
    /// until the replacement is ready. Returns false when the request ring
    /// is full.
    pub fn request_patch_build(&mut self, name: &str) -> bool {
        self.requests
            .push(WorkRequest::Build {
                source: PatchSource::new(name),
                time_step: self.time_step,
            })
            .is_ok()
    }

    /// Queue an event for the next render call. Events past the queue
    /// capacity are dropped rather than allocating on the audio thread.
    pub fn handle_event(&mut self, event: EngineEvent) {
        if self.events.len() < MAX_PENDING_EVENTS {
            self.events.push(event);
        }
    }

    /// Render one buffer, applying queued events at their frame offsets.
    pub fn render(&mut self, out: &mut [f32]) {
        self.drain_responses();
        let frames = out.len() as u32;
        let mut cursor = 0u32;
        for index in 0..self.events.len() {
            let event = self.events[index];
            // a frame before the cursor or past the buffer still fires, at
            // the nearest point inside what remains
            let frame = event.frame.clamp(cursor, frames);
            self.write_samples(&mut out[cursor as usize..frame as usize]);
            self.apply(event.kind);
            cursor = frame;
        }
        self.events.clear();
        self.write_samples(&mut out[cursor as usize..]);
    }

    /// Install finished builds and hand retired units back to the worker.
    fn drain_responses(&mut self) {
        while let Ok(response) = self.responses.pop() {
            match response {
                WorkResponse::Ready(unit) => {
                    self.last_failure = None;
                    if let Some(old) = self.patch.replace(unit) {
                        self.retire(old);
                    }
                }
                WorkResponse::Rejected(failure) => {
                    self.last_failure = Some(failure);
                }
            }
        }
        while let Some(unit) = self.retired.pop() {
            match self.requests.push(WorkRequest::Dispose(unit)) {
                Ok(()) => {}
                Err(rtrb::PushError::Full(WorkRequest::Dispose(unit))) => {
                    self.retired.push(unit);
                    break;
                }
                Err(rtrb::PushError::Full(request)) => {
                    mem::forget(request);
                    break;
                }
            }
        }
    }

    fn retire(&mut self, unit: PatchUnit) {
        match self.requests.push(WorkRequest::Dispose(unit)) {
            Ok(()) => {}
            Err(rtrb::PushError::Full(WorkRequest::Dispose(unit)))
                if self.retired.len() < MAX_RETIRED =>
            {
                self.retired.push(unit);
            }
            // both rings jammed: leak rather than run the drop here
            Err(rtrb::PushError::Full(request)) => mem::forget(request),
        }
    }

    fn apply(&mut self, kind: EventKind) {
        match kind {
            EventKind::NoteOn { note, velocity } => {
                let velocity = velocity as f32 / 127.0;
                self.pool
                    .note_on(note, velocity, self.bend * self.bend_range);
            }
            EventKind::NoteOff { note } => self.pool.note_off(note),
            EventKind::NotePressure { note, pressure } => {
                self.pool.pressure(note, pressure as f32 / 127.0);
            }
            EventKind::PitchBend { value } => {
                self.bend = bend_amount(value);
                self.pool.apply_bend(self.bend * self.bend_range);
            }
            EventKind::Controller { controller, value } => {
                if let Some(slot) = self.cv.get_mut(controller as usize) {
                    *slot = value as f32 / 127.0;
                }
            }
            EventKind::SetPolyphony { voices } => {
                self.pool.set_polyphony(voices as usize);
            }
            EventKind::SetBendRange { semitones } => {
                self.bend_range = semitones;
                self.pool.apply_bend(self.bend * self.bend_range);
            }
            EventKind::StateRequest => self.sync_requested = true,
        }
    }

    /// Sum the active voices into `out`. Without a loaded patch the output
    /// is silence.
    fn write_samples(&mut self, out: &mut [f32]) {
        let Self {
            patch, pool, cv, ..
        } = self;
        let patch = match patch {
            Some(patch) if patch.loaded => patch,
            _ => {
                out.fill(0.0);
                return;
            }
        };
        let slots = pool.active_slots();
        for sample in out.iter_mut() {
            let mut sum = 0.0;
            for (index, voice) in slots.iter().enumerate() {
                let ctx = StepCtx {
                    frequency: voice.frequency,
                    velocity: voice.velocity,
                    cv,
                };
                sum += patch.step(index, &ctx);
            }
            *sample = sum;
        }
    }
}

/// Everything needed to restore an engine's control state. Controllers
/// still at their default of zero are left out.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub patch: Option<PatchSource>,
    pub polyphony: usize,
    pub bend_range: f32,
    pub cv: Vec<(u8, f32)>,
}

#[cfg(feature = "serde")]
impl Engine {
    /// Capture the control state and clear any pending sync request.
    pub fn snapshot(&mut self) -> EngineSnapshot {
        self.sync_requested = false;
        EngineSnapshot {
            patch: self.patch.as_ref().map(|unit| unit.source.clone()),
            polyphony: self.pool.polyphony(),
            bend_range: self.bend_range,
            cv: self
                .cv
                .iter()
                .enumerate()
                .filter(|(_, &value)| value != 0.0)
                .map(|(index, &value)| (index as u8, value))
                .collect(),
        }
    }

    /// Apply a snapshot, requesting a rebuild of its patch. Not for the
    /// audio thread; the patch arrives through the usual worker path.
    pub fn restore(&mut self, snapshot: &EngineSnapshot) {
        self.pool.set_polyphony(snapshot.polyphony);
        self.bend_range = snapshot.bend_range;
        self.cv = [0.0; CV_COUNT];
        for &(index, value) in &snapshot.cv {
            self.set_control_value(index as usize, value);
        }
        if let Some(source) = &snapshot.patch {
            self.request_patch_build(&source.name);
        }
    }
}
