use crate::dsp::generator::OutputRange;

/*
Signal Processors
=================

A processor takes one input sample and produces one output sample. The
input arrives explicitly rather than being pulled from an upstream source,
which keeps processors free of wiring concerns; the graph layer (or a
patch stepping primitives by hand) decides where samples come from.

Most processors are stateless apart from their configuration. The slew rate
limiter and sample-and-hold carry state between samples.
*/

/// Multiplies the input by a ratio. Negative ratios invert the signal.
#[derive(Debug, Clone, Copy)]
pub struct Amplifier {
    pub ratio: f32,
}

impl Default for Amplifier {
    fn default() -> Self {
        Self { ratio: 1.0 }
    }
}

impl Amplifier {
    pub fn new(ratio: f32) -> Self {
        Self { ratio }
    }

    pub fn process(&self, input: f32) -> f32 {
        input * self.ratio
    }
}

/// Hard-clips the input to its range.
#[derive(Debug, Clone, Copy, Default)]
pub struct Limiter {
    pub range: OutputRange,
}

impl Limiter {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            range: OutputRange::new(min, max),
        }
    }

    pub fn process(&self, input: f32) -> f32 {
        input.clamp(self.range.min, self.range.max)
    }
}

/// Folds the input back across its range limits.
///
/// A sample past a limit is reflected across that limit, and across the
/// opposite limit if it is still out of range, as many times as needed. The
/// number of reflections is computed in closed form rather than iterated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rectifier {
    pub range: OutputRange,
}

impl Rectifier {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            range: OutputRange::new(min, max),
        }
    }

    pub fn process(&self, input: f32) -> f32 {
        let min = self.range.min;
        let max = self.range.max;
        let range = max - min;
        if range <= 0.0 {
            return input;
        }
        if input < min {
            let delta = min - input;
            let flips = (delta / range).floor() as i64;
            if flips % 2 == 0 {
                min + (delta % range)
            } else {
                max - (delta % range)
            }
        } else if input > max {
            let delta = input - max;
            let flips = (delta / range).floor() as i64;
            if flips % 2 == 0 {
                max - (delta % range)
            } else {
                min + (delta % range)
            }
        } else {
            input
        }
    }
}

/// Limits how fast the output can follow the input.
///
/// Rise and fall rates are given as the number of seconds the output would
/// take to traverse the source's whole range; zero or negative means
/// unlimited. Useful for smoothing control signals and portamento glides.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlewRateLimiter {
    pub rise_time: f32,
    pub fall_time: f32,
    value: f32,
}

impl SlewRateLimiter {
    pub fn new(rise_time: f32, fall_time: f32) -> Self {
        Self {
            rise_time,
            fall_time,
            value: 0.0,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn step(&mut self, target: f32, source_range: f32, time_step: f32) -> f32 {
        if target > self.value {
            let mut delta = target - self.value;
            if self.rise_time > 0.0 {
                let max_delta = source_range / (self.rise_time / time_step);
                delta = delta.min(max_delta);
            }
            self.value += delta;
        } else if target < self.value {
            let mut delta = self.value - target;
            if self.fall_time > 0.0 {
                let max_delta = source_range / (self.fall_time / time_step);
                delta = delta.min(max_delta);
            }
            self.value -= delta;
        }
        self.value
    }
}

/// Restricts the input to a number of discrete steps across its range.
/// Zero steps passes the signal through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantizer {
    pub steps: u32,
    pub range: OutputRange,
}

impl Quantizer {
    pub fn new(steps: u32) -> Self {
        Self {
            steps,
            range: OutputRange::default(),
        }
    }

    pub fn process(&self, input: f32) -> f32 {
        if self.steps == 0 {
            return input;
        }
        let interval = self.range.span() / self.steps as f32;
        self.range.min + (((input - self.range.min) / interval).round() * interval)
    }
}

/// Samples the input at its own frequency and holds the value in between.
#[derive(Debug, Clone, Copy)]
pub struct SampleAndHold {
    pub frequency: f32,
    phase: f32,
    sampled: f32,
}

impl Default for SampleAndHold {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl SampleAndHold {
    pub fn new(frequency: f32) -> Self {
        // start at the end of a sampling period so the first input sample is
        // captured immediately
        Self {
            frequency,
            phase: 1.0,
            sampled: 0.0,
        }
    }

    pub fn step(&mut self, input: f32, time_step: f32) -> f32 {
        if self.phase >= 1.0 {
            self.phase %= 1.0;
            self.sampled = input;
        }
        self.phase += time_step * self.frequency;
        self.sampled
    }
}

/// Blends two inputs: `a * (1 - ratio) + b * ratio`.
#[derive(Debug, Clone, Copy)]
pub struct Mixer {
    pub ratio: f32,
}

impl Default for Mixer {
    fn default() -> Self {
        Self { ratio: 0.5 }
    }
}

impl Mixer {
    pub fn new(ratio: f32) -> Self {
        Self { ratio }
    }

    pub fn mix(&self, a: f32, b: f32) -> f32 {
        (a * (1.0 - self.ratio)) + (b * self.ratio)
    }
}
