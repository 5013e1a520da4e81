use crate::dsp::delay::Delay;
use crate::dsp::envelope::{Ad, Adsr};
use crate::dsp::generator::{BrownNoise, Dc, PinkNoise, WhiteNoise};
use crate::dsp::oscillator::{Additive, Interpolated, Pulse, Saw, Sine, Triangle};
use crate::dsp::processor::{
    Amplifier, Limiter, Mixer, Quantizer, Rectifier, SampleAndHold, SlewRateLimiter,
};
use crate::ControlValues;

/// Per-voice values a graph reads while stepping.
///
/// The frequency and velocity come from the voice the graph belongs to; the
/// controller array is shared by all voices.
pub struct StepCtx<'a> {
    pub frequency: f32,
    pub velocity: f32,
    pub cv: &'a ControlValues,
}

/// Index of a node in its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(pub(crate) usize);

/// Where a node reads one of its inputs from.
///
/// `None` is a disconnected input and yields silence, except on an
/// oscillator's frequency input, where it means "use the frequency stored on
/// the oscillator" so patch code can drive the pitch directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    None,
    Const(f32),
    /// The voice's current frequency.
    Frequency,
    /// The voice's current velocity.
    Velocity,
    /// A shared controller value.
    Cv(u8),
    /// Another node's output.
    Node(NodeId),
}

/// One node of a signal graph.
///
/// The variant set is closed: a patch composes these, it does not add new
/// ones. `Detached` is both the placeholder left in the arena while a node
/// is being evaluated and the evaluator's cycle-breaker: a pull that reaches
/// a detached slot yields silence instead of recursing forever.
pub enum Node {
    Detached,
    Dc(Dc),
    WhiteNoise(WhiteNoise),
    PinkNoise(PinkNoise),
    BrownNoise(BrownNoise),
    Sine {
        osc: Sine,
        frequency: Input,
        /// Oscillator whose phase is reset when this one completes a cycle.
        sync: Option<NodeId>,
    },
    Pulse {
        osc: Pulse,
        frequency: Input,
        width: Input,
        sync: Option<NodeId>,
    },
    Saw {
        osc: Saw,
        frequency: Input,
        sync: Option<NodeId>,
    },
    Triangle {
        osc: Triangle,
        frequency: Input,
        sync: Option<NodeId>,
    },
    Interpolated {
        osc: Interpolated,
        frequency: Input,
        sync: Option<NodeId>,
    },
    Additive {
        osc: Additive,
        frequency: Input,
        sync: Option<NodeId>,
    },
    Adsr {
        env: Adsr,
        gate: Input,
    },
    Ad {
        env: Ad,
        gate: Input,
    },
    Amplify {
        source: Input,
        ratio: Input,
        amp: Amplifier,
    },
    Limit {
        source: Input,
        limiter: Limiter,
    },
    Rectify {
        source: Input,
        rectifier: Rectifier,
    },
    Slew {
        source: Input,
        slew: SlewRateLimiter,
        source_range: f32,
    },
    Quantize {
        source: Input,
        quantizer: Quantizer,
    },
    SampleHold {
        source: Input,
        sampler: SampleAndHold,
    },
    Mix {
        a: Input,
        b: Input,
        mixer: Mixer,
    },
    /// Amplitude modulation: `(1 + modulator) * carrier`.
    Am {
        carrier: Input,
        modulator: Input,
    },
    /// Frequency modulation: steps the carrier oscillator at its stored
    /// frequency plus the modulator, restoring the stored frequency after.
    Fm {
        carrier: NodeId,
        modulator: Input,
    },
    DelayLine {
        source: Input,
        delay: Delay,
    },
    /// Fan-out point. Holds the value the outputs share for the current
    /// sample; pulled only through its outputs.
    Splitter {
        source: Input,
        value: f32,
    },
    /// One consumer-facing leg of a splitter. `sent` marks whether this leg
    /// has delivered the splitter's current value yet.
    SplitterOutput {
        splitter: NodeId,
        sent: bool,
    },
}
