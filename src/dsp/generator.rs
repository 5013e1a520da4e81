#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Signal Generators
=================

Everything in this crate that produces samples carries an output range: the
minimum and maximum values the signal can take. Oscillators and envelopes
compute a canonical waveform and then map it onto their range, which is how
the same sine primitive serves as both an audio voice (-1.0 to 1.0) and a
low-frequency modulator (say, 0.05 to 0.5 driving a pulse width).

The generators in this module have no periodic state of their own: a constant
source and three colors of noise.

  white   Flat spectrum. A fresh uniform random sample every step.

  pink    1/f spectrum, via the Voss-McCartney algorithm: a bank of held
          white-noise registers where register N is replaced every 2^N
          steps, plus a fresh white sample on top. The trailing-zero count
          of a wrapping counter selects which register to replace.

  brown   1/f^2 spectrum, via a bounded random walk. Steps that would leave
          the walk's range are rejected and redrawn.
*/

/// The output range of a signal source.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputRange {
    pub min: f32,
    pub max: f32,
}

impl Default for OutputRange {
    fn default() -> Self {
        Self {
            min: -1.0,
            max: 1.0,
        }
    }
}

impl OutputRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    pub fn midpoint(&self) -> f32 {
        (self.min + self.max) / 2.0
    }

    /// Map a canonical -1.0 to 1.0 value onto this range.
    ///
    /// The default range passes the value through untouched so full-scale
    /// audio paths don't accumulate rounding from a round trip through the
    /// mapping.
    pub fn map_bipolar(&self, value: f32) -> f32 {
        if self.min == -1.0 && self.max == 1.0 {
            value
        } else {
            self.min + (((value + 1.0) / 2.0) * self.span())
        }
    }

    /// Map a 0.0 to 1.0 fraction onto this range.
    pub fn map_unipolar(&self, fraction: f32) -> f32 {
        self.min + (fraction * self.span())
    }
}

/// Emits a constant value: the midpoint of its range.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dc {
    pub range: OutputRange,
}

impl Dc {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            range: OutputRange::new(min, max),
        }
    }

    pub fn step(&self) -> f32 {
        self.range.midpoint()
    }
}

/// Uniform random noise with a flat spectrum.
#[derive(Debug, Clone)]
pub struct WhiteNoise {
    pub range: OutputRange,
    rng: fastrand::Rng,
}

impl Default for WhiteNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl WhiteNoise {
    pub fn new() -> Self {
        Self {
            range: OutputRange::default(),
            rng: fastrand::Rng::new(),
        }
    }

    pub fn step(&mut self) -> f32 {
        self.range.map_unipolar(self.rng.f32())
    }
}

const PINK_OCTAVES: usize = 30;

/// Voss-McCartney pink noise with a 1/f spectrum.
#[derive(Debug, Clone)]
pub struct PinkNoise {
    pub range: OutputRange,
    octaves: [f32; PINK_OCTAVES],
    sum: f32,
    max_sum: f32,
    counter: u32,
    rng: fastrand::Rng,
}

impl Default for PinkNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl PinkNoise {
    pub fn new() -> Self {
        let mut rng = fastrand::Rng::new();
        let mut octaves = [0.0; PINK_OCTAVES];
        let mut sum = 0.0;
        // seed every register so the signal starts at a steady state
        for octave in octaves.iter_mut() {
            *octave = rng.f32();
            sum += *octave;
        }
        Self {
            range: OutputRange::default(),
            octaves,
            sum,
            max_sum: (PINK_OCTAVES + 1) as f32,
            counter: 0,
            rng,
        }
    }

    pub fn step(&mut self) -> f32 {
        const MAX_COUNTER: u32 = (1 << PINK_OCTAVES) - 1;
        self.counter = (self.counter + 1) & MAX_COUNTER;
        // a counter of zero would claim an infinite run of trailing zeros,
        // so no register is replaced on that step
        if self.counter != 0 {
            let register = self.counter.trailing_zeros() as usize;
            let fresh = self.rng.f32();
            self.sum -= self.octaves[register];
            self.sum += fresh;
            self.octaves[register] = fresh;
        }
        let white = self.rng.f32();
        self.range.map_unipolar((self.sum + white) / self.max_sum)
    }
}

/// Random-walk brown noise with a 1/f^2 spectrum.
#[derive(Debug, Clone)]
pub struct BrownNoise {
    pub range: OutputRange,
    sum: f32,
    max_sum: f32,
    rng: fastrand::Rng,
}

impl Default for BrownNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl BrownNoise {
    pub fn new() -> Self {
        let max_sum = 16.0;
        Self {
            range: OutputRange::default(),
            sum: max_sum / 2.0,
            max_sum,
            rng: fastrand::Rng::new(),
        }
    }

    pub fn step(&mut self) -> f32 {
        // draw offsets until one keeps the walk inside its bounds
        loop {
            let offset = (self.rng.f32() * 2.0) - 1.0;
            let next = self.sum + offset;
            if (0.0..=self.max_sum).contains(&next) {
                self.sum = next;
                break;
            }
        }
        self.range.map_unipolar(self.sum / self.max_sum)
    }
}
