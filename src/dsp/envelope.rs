use crate::dsp::generator::OutputRange;

/*
Envelopes
=========

An envelope is a non-periodic level that moves through a sequence of stages,
driven by an excitation value rather than by explicit note-on/note-off calls.
In this engine the excitation is a voice's velocity: a rise through zero means
a key went down, a fall to zero means it came up. Feeding the velocity in
every sample keeps envelopes stateless about where notes come from, which is
what lets a silent voice keep ringing out its release after note-off.

The Shape
---------

  Level
   max ┐     ╱╲
       │    ╱  ╲___________
   sus │   ╱               ╲
       │  ╱                 ╲
   min └─╱───────────────────╲──→ Time
       Attack Decay  Sustain  Release

Stages move linearly at (distance / duration) per second, where distance is
measured against the envelope's output range. A stage duration of zero (or
less) snaps directly to the stage target. The sustain level is a fraction of
the range: 0.5 holds halfway between min and max.

Retriggering
------------

A rising edge re-enters Attack from ANY stage, and the level resumes from
wherever it currently is rather than resetting to min. This keeps fast
retrigger click-free. Several stages can complete within a single step when
their durations are shorter than one sample, so the stage logic cascades
instead of matching on a single stage.
*/

/// Fires when a value crosses from at-or-below a threshold to above it.
#[derive(Debug, Clone, Default)]
pub struct RisingEdge {
    pub threshold: f32,
    last: f32,
}

impl RisingEdge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&mut self, value: f32) -> bool {
        let fired = self.last <= self.threshold && value > self.threshold;
        self.last = value;
        fired
    }
}

/// Fires when a value crosses from above a threshold to at-or-below it.
#[derive(Debug, Clone, Default)]
pub struct FallingEdge {
    pub threshold: f32,
    last: f32,
}

impl FallingEdge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&mut self, value: f32) -> bool {
        let fired = self.last > self.threshold && value <= self.threshold;
        self.last = value;
        fired
    }
}

/// The current stage of an envelope's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Classic four-stage envelope driven by an excitation value.
#[derive(Debug, Clone)]
pub struct Adsr {
    /// Attack time in seconds.
    pub attack: f32,
    /// Decay time in seconds.
    pub decay: f32,
    /// Sustain level as a fraction of the output range.
    pub sustain: f32,
    /// Release time in seconds.
    pub release: f32,
    pub range: OutputRange,
    stage: EnvelopeStage,
    value: f32,
    rising: RisingEdge,
    falling: FallingEdge,
}

impl Default for Adsr {
    fn default() -> Self {
        // the default envelope is rectangular: instant attack, full sustain,
        // instant release
        Self::new(0.0, 0.0, 1.0, 0.0)
    }
}

impl Adsr {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
            range: OutputRange::new(0.0, 1.0),
            stage: EnvelopeStage::Idle,
            value: 0.0,
            rising: RisingEdge::new(),
            falling: FallingEdge::new(),
        }
    }

    pub fn set_range(&mut self, min: f32, max: f32) {
        self.range = OutputRange::new(min, max);
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    /// Advance by one sample, driven by the excitation value.
    pub fn step(&mut self, excitation: f32, time_step: f32) -> f32 {
        if self.rising.step(excitation) {
            self.stage = EnvelopeStage::Attack;
        }
        if self.falling.step(excitation) {
            self.stage = EnvelopeStage::Release;
        }
        let min = self.range.min;
        let max = self.range.max;
        let sustain_level = self.range.map_unipolar(self.sustain);
        if self.stage == EnvelopeStage::Idle {
            return min;
        }
        // stages cascade: a zero-length stage completes within this step
        if self.stage == EnvelopeStage::Attack {
            if self.attack <= 0.0 {
                self.value = max;
            }
            if self.value < max {
                self.value += (time_step / self.attack) * (max - min);
            } else {
                self.stage = EnvelopeStage::Decay;
            }
        }
        if self.stage == EnvelopeStage::Decay {
            if self.decay <= 0.0 {
                self.value = sustain_level;
            }
            if self.value > sustain_level {
                self.value -= (time_step / self.decay) * (max - sustain_level);
            } else {
                self.stage = EnvelopeStage::Sustain;
            }
        }
        if self.stage == EnvelopeStage::Sustain {
            self.value = sustain_level;
        }
        if self.stage == EnvelopeStage::Release {
            if self.release <= 0.0 {
                self.value = min;
            }
            if self.value > min {
                self.value -= (time_step / self.release) * (sustain_level - min);
            } else {
                self.stage = EnvelopeStage::Idle;
            }
        }
        self.value = self.value.clamp(min, max);
        self.value
    }
}

/// Two-stage attack/decay envelope for percussive sounds that don't care how
/// long a note is held.
#[derive(Debug, Clone)]
pub struct Ad {
    pub attack: f32,
    pub decay: f32,
    pub range: OutputRange,
    stage: EnvelopeStage,
    value: f32,
    rising: RisingEdge,
}

impl Ad {
    pub fn new(attack: f32, decay: f32) -> Self {
        Self {
            attack,
            decay,
            range: OutputRange::new(0.0, 1.0),
            stage: EnvelopeStage::Idle,
            value: 0.0,
            rising: RisingEdge::new(),
        }
    }

    pub fn set_range(&mut self, min: f32, max: f32) {
        self.range = OutputRange::new(min, max);
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn step(&mut self, excitation: f32, time_step: f32) -> f32 {
        if self.rising.step(excitation) {
            self.stage = EnvelopeStage::Attack;
        }
        let min = self.range.min;
        let max = self.range.max;
        if self.stage == EnvelopeStage::Idle {
            return min;
        }
        if self.stage == EnvelopeStage::Attack {
            if self.attack <= 0.0 {
                self.value = max;
            }
            if self.value < max {
                self.value += (time_step / self.attack) * (max - min);
            } else {
                self.stage = EnvelopeStage::Decay;
            }
        }
        if self.stage == EnvelopeStage::Decay {
            if self.decay <= 0.0 {
                self.value = min;
            }
            if self.value > min {
                self.value -= (time_step / self.decay) * (max - min);
            } else {
                self.stage = EnvelopeStage::Idle;
            }
        }
        self.value = self.value.clamp(min, max);
        self.value
    }
}
