use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::generator::OutputRange;

/*
Oscillators
===========

An oscillator produces a periodic signal: a tone at audio frequencies, or a
slow control wave driving vibrato, tremolo or pulse width at sub-audio rates.

Vocabulary
----------

  frequency   Cycles per second. Can change at any time, including between
              two samples of the same period.

  phase       Where we are in the current cycle, 0.0 to 1.0. Phase is the
              persistent state: keeping it independent of frequency lets the
              pitch change mid-period without a discontinuity in the output.

  time_step   Seconds per sample, 1 / sample_rate. Passed into every step so
              a single oscillator instance works at any rate.

Every step computes the output value from the CURRENT phase first and
advances the phase afterwards, so the very first sample of a cycle lands on
phase 0.0 exactly.

Phase advances by `time_step * frequency` and wraps with fmod. The wrap is
also where hard sync happens: the residual phase after wrapping is handed to
a sync slave, snapping the slave back to the start of its cycle.
*/

/// A single point on an interpolated waveform, as (phase, value).
/// Phase runs 0.0 to 1.0 and value -1.0 to 1.0.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapePoint {
    pub phase: f32,
    pub value: f32,
}

impl ShapePoint {
    pub fn new(phase: f32, value: f32) -> Self {
        Self { phase, value }
    }
}

/// Advance a phase accumulator by one sample, wrapping at 1.0.
/// Returns the residual phase when a cycle completed.
#[inline]
fn advance_phase(phase: &mut f32, frequency: f32, time_step: f32) -> Option<f32> {
    *phase += time_step * frequency;
    if *phase >= 1.0 {
        *phase %= 1.0;
        Some(*phase)
    } else {
        None
    }
}

/// Sine wave oscillator.
#[derive(Debug, Clone, Default)]
pub struct Sine {
    pub frequency: f32,
    pub phase: f32,
    pub range: OutputRange,
}

impl Sine {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            ..Self::default()
        }
    }

    pub fn with_range(frequency: f32, min: f32, max: f32) -> Self {
        Self {
            frequency,
            phase: 0.0,
            range: OutputRange::new(min, max),
        }
    }

    pub fn step(&mut self, time_step: f32) -> f32 {
        let value = self.range.map_bipolar((self.phase * TAU).sin());
        advance_phase(&mut self.phase, self.frequency, time_step);
        value
    }

    pub fn step_at(&mut self, frequency: f32, time_step: f32) -> f32 {
        self.frequency = frequency;
        self.step(time_step)
    }
}

/// Pulse wave oscillator with a variable duty cycle.
#[derive(Debug, Clone)]
pub struct Pulse {
    pub frequency: f32,
    pub phase: f32,
    pub width: f32,
    pub range: OutputRange,
}

impl Default for Pulse {
    fn default() -> Self {
        Self {
            frequency: 0.0,
            phase: 0.0,
            width: 0.5,
            range: OutputRange::default(),
        }
    }
}

impl Pulse {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            ..Self::default()
        }
    }

    pub fn step(&mut self, time_step: f32) -> f32 {
        let value = if self.phase < self.width {
            self.range.max
        } else {
            self.range.min
        };
        advance_phase(&mut self.phase, self.frequency, time_step);
        value
    }

    pub fn step_at(&mut self, frequency: f32, time_step: f32) -> f32 {
        self.frequency = frequency;
        self.step(time_step)
    }
}

/// Rising sawtooth oscillator.
#[derive(Debug, Clone, Default)]
pub struct Saw {
    pub frequency: f32,
    pub phase: f32,
    pub range: OutputRange,
}

impl Saw {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            ..Self::default()
        }
    }

    pub fn step(&mut self, time_step: f32) -> f32 {
        let value = self.range.map_unipolar(self.phase);
        advance_phase(&mut self.phase, self.frequency, time_step);
        value
    }

    pub fn step_at(&mut self, frequency: f32, time_step: f32) -> f32 {
        self.frequency = frequency;
        self.step(time_step)
    }
}

/// Triangle wave oscillator. Starts at the range midpoint and rises first.
#[derive(Debug, Clone, Default)]
pub struct Triangle {
    pub frequency: f32,
    pub phase: f32,
    pub range: OutputRange,
}

impl Triangle {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            ..Self::default()
        }
    }

    pub fn step(&mut self, time_step: f32) -> f32 {
        let fraction = if self.phase < 0.25 {
            0.5 + (self.phase * 2.0)
        } else if self.phase < 0.75 {
            1.0 - ((self.phase - 0.25) * 2.0)
        } else {
            (self.phase - 0.75) * 2.0
        };
        advance_phase(&mut self.phase, self.frequency, time_step);
        self.range.map_unipolar(fraction)
    }

    pub fn step_at(&mut self, frequency: f32, time_step: f32) -> f32 {
        self.frequency = frequency;
        self.step(time_step)
    }
}

pub const MAX_SHAPE_POINTS: usize = 16;

/// Break-point oscillator interpolating straight lines between up to 16
/// (phase, value) points.
///
/// The output value is persistent: each step moves the value toward the next
/// point in phase order, so the shape can be replaced at any time without a
/// discontinuity in the output. Two consecutive points with the same phase
/// produce an immediate jump when the phase crosses them.
#[derive(Debug, Clone)]
pub struct Interpolated {
    pub frequency: f32,
    pub phase: f32,
    pub range: OutputRange,
    points: [ShapePoint; MAX_SHAPE_POINTS],
    count: usize,
    value: f32,
}

impl Default for Interpolated {
    fn default() -> Self {
        Self {
            frequency: 0.0,
            phase: 0.0,
            range: OutputRange::default(),
            points: [ShapePoint::new(0.0, 0.0); MAX_SHAPE_POINTS],
            count: 0,
            value: 0.0,
        }
    }
}

impl Interpolated {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            ..Self::default()
        }
    }

    /// Replace the waveform. Points must be ordered by phase; anything past
    /// the first 16 is ignored.
    pub fn shape(&mut self, points: &[ShapePoint]) {
        let count = points.len().min(MAX_SHAPE_POINTS);
        self.points[..count].copy_from_slice(&points[..count]);
        self.count = count;
    }

    pub fn step(&mut self, time_step: f32) -> f32 {
        if self.count == 0 {
            advance_phase(&mut self.phase, self.frequency, time_step);
            return self.range.map_bipolar(self.value);
        }
        let phase_step = time_step * self.frequency;
        let points = &self.points[..self.count];
        // the target defaults to the first point so wrapping at the end of
        // the cycle needs no special case
        let mut target = points[0];
        for point in points {
            // when the phase jumps across a point, go straight to its value
            if self.phase >= point.phase && self.phase - phase_step < point.phase {
                self.value = point.value;
            }
            // the first point ahead of the current phase is the target
            if self.phase < point.phase {
                target = *point;
                break;
            }
        }
        let mut delta_phase = target.phase - self.phase;
        if delta_phase < 0.0 {
            delta_phase += 1.0;
        }
        if phase_step > delta_phase {
            self.value = target.value;
        } else if delta_phase != 0.0 {
            self.value += phase_step * ((target.value - self.value) / delta_phase);
        }
        advance_phase(&mut self.phase, self.frequency, time_step);
        self.range.map_bipolar(self.value)
    }

    pub fn step_at(&mut self, frequency: f32, time_step: f32) -> f32 {
        self.frequency = frequency;
        self.step(time_step)
    }
}

/// One sine partial of an additive oscillator.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct Partial {
    /// Frequency as a multiple of the fundamental.
    pub multiple: f32,
    /// Amplitude relative to the oscillator's total amplitude.
    pub amplitude: f32,
    /// Current phase of this partial, 0.0 to 1.0.
    pub phase: f32,
}

/// A bank of sine partials at multiples of a fundamental frequency.
///
/// Instead of calling the sine function for every partial of every sample,
/// one period of the fundamental is rendered into a lookup table whenever the
/// fundamental or the output range changes, and partials read from the table
/// with linear interpolation. The table rebuild allocates, so pitch changes
/// are the one non-realtime-safe operation here; steady-state stepping is
/// allocation-free.
#[derive(Debug, Clone)]
pub struct Additive {
    pub frequency: f32,
    pub phase: f32,
    pub range: OutputRange,
    pub partials: Vec<Partial>,
    table: Vec<f32>,
    table_frequency: f32,
    table_range: OutputRange,
    table_period: f32,
}

impl Additive {
    /// Create a bank of `partial_count` partials arranged as a harmonic
    /// series with 1/N amplitudes, approximating a saw wave.
    pub fn new(partial_count: usize, frequency: f32) -> Self {
        let partial_count = partial_count.max(1);
        let partials = (1..=partial_count)
            .map(|n| Partial {
                multiple: n as f32,
                amplitude: 1.0 / n as f32,
                phase: 0.0,
            })
            .collect();
        Self {
            frequency,
            phase: 0.0,
            range: OutputRange::default(),
            partials,
            table: Vec::new(),
            table_frequency: 0.0,
            table_range: OutputRange::default(),
            table_period: 0.0,
        }
    }

    fn update_table(&mut self, time_step: f32) {
        let frequency_changed = self.frequency != self.table_frequency;
        let range_changed = self.range != self.table_range;
        if frequency_changed {
            self.table_frequency = self.frequency;
            self.table_period = 1.0 / (self.frequency * time_step);
            let samples = self.table_period.ceil() as usize;
            if samples != self.table.len() {
                self.table.resize(samples, 0.0);
            }
        }
        if frequency_changed || range_changed {
            let phase_step = TAU / self.table_period;
            let mut phase = 0.0f32;
            for sample in self.table.iter_mut() {
                *sample = self.range.map_unipolar((phase.sin() + 1.0) / 2.0);
                phase += phase_step;
            }
            self.table_range = self.range;
        }
    }

    pub fn step(&mut self, time_step: f32) -> f32 {
        if self.frequency == 0.0 || self.partials.is_empty() {
            return 0.0;
        }
        self.update_table(time_step);
        let phase_step = time_step * self.frequency;
        let table_len = self.table.len();
        let mut value = 0.0;
        for partial in self.partials.iter_mut() {
            let sample = self.table_period * partial.phase;
            let index = (sample.floor() as usize) % table_len;
            let mix = sample - index as f32;
            let curr = self.table[index];
            let next = self.table[(index + 1) % table_len];
            value += partial.amplitude * ((curr * (1.0 - mix)) + (next * mix));
            partial.phase = (partial.phase + (phase_step * partial.multiple)) % 1.0;
        }
        advance_phase(&mut self.phase, self.frequency, time_step);
        value
    }

    pub fn step_at(&mut self, frequency: f32, time_step: f32) -> f32 {
        self.frequency = frequency;
        self.step(time_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIME_STEP: f32 = 1.0 / 64.0;
    const ERR: f32 = 0.0001;

    #[test]
    fn sine_quarters_hit_range_extremes() {
        let mut osc = Sine::default();
        osc.range = OutputRange::new(-0.5, 0.5);
        osc.frequency = 1.0 / (4.0 * TIME_STEP);
        assert!((osc.step(TIME_STEP) - 0.0).abs() < ERR);
        assert!((osc.step(TIME_STEP) - 0.5).abs() < ERR);
        assert!((osc.step(TIME_STEP) - 0.0).abs() < ERR);
        assert!((osc.step(TIME_STEP) - -0.5).abs() < ERR);
        assert!((osc.step(TIME_STEP) - 0.0).abs() < ERR);
    }

    #[test]
    fn pulse_width_controls_duty_cycle() {
        let mut osc = Pulse::default();
        osc.range = OutputRange::new(-0.5, 0.5);
        osc.frequency = 1.0 / (4.0 * TIME_STEP);
        assert_eq!(osc.step(TIME_STEP), 0.5); // width 0.5
        assert_eq!(osc.step(TIME_STEP), 0.5);
        assert_eq!(osc.step(TIME_STEP), -0.5);
        assert_eq!(osc.step(TIME_STEP), -0.5);
        osc.width = 0.25;
        assert_eq!(osc.step(TIME_STEP), 0.5); // width 0.25
        assert_eq!(osc.step(TIME_STEP), -0.5);
        assert_eq!(osc.step(TIME_STEP), -0.5);
        assert_eq!(osc.step(TIME_STEP), -0.5);
    }

    #[test]
    fn saw_ramps_and_wraps() {
        let mut osc = Saw::default();
        osc.range = OutputRange::new(0.0, 4.0);
        osc.frequency = 1.0 / (4.0 * TIME_STEP);
        assert!((osc.step(TIME_STEP) - 0.0).abs() < ERR);
        assert!((osc.step(TIME_STEP) - 1.0).abs() < ERR);
        assert!((osc.step(TIME_STEP) - 2.0).abs() < ERR);
        assert!((osc.step(TIME_STEP) - 3.0).abs() < ERR);
        assert!((osc.step(TIME_STEP) - 0.0).abs() < ERR);
    }

    #[test]
    fn triangle_rises_from_midpoint() {
        let mut osc = Triangle::default();
        osc.range = OutputRange::new(-2.0, 2.0);
        osc.frequency = 1.0 / (8.0 * TIME_STEP);
        let expected = [0.0, 1.0, 2.0, 1.0, 0.0, -1.0, -2.0, -1.0, 0.0];
        for value in expected {
            assert!((osc.step(TIME_STEP) - value).abs() < ERR);
        }
    }

    #[test]
    fn interpolated_follows_and_jumps() {
        let mut osc = Interpolated::default();
        osc.range = OutputRange::new(-2.0, 2.0);
        osc.frequency = 1.0 / (8.0 * TIME_STEP);
        osc.shape(&[
            ShapePoint::new(0.25, 1.0),
            ShapePoint::new(0.5, 1.0),
            ShapePoint::new(0.5, -1.0),
            ShapePoint::new(0.75, -1.0),
        ]);
        let expected = [1.0, 2.0, 2.0, 2.0, -2.0, -2.0, -1.0, 0.0];
        for value in expected {
            assert!((osc.step(TIME_STEP) - value).abs() < ERR);
        }
    }

    #[test]
    fn interpolated_reshape_is_continuous() {
        let mut osc = Interpolated::default();
        osc.frequency = 1.0 / (64.0 * TIME_STEP);
        osc.shape(&[ShapePoint::new(0.25, 1.0), ShapePoint::new(0.75, -1.0)]);
        // get partway into the cycle, away from any point
        let mut last = 0.0;
        for _ in 0..20 {
            last = osc.step(TIME_STEP);
        }
        // switch to a square mid-cycle: the value keeps moving from where it
        // is instead of snapping to the new waveform
        osc.shape(&[
            ShapePoint::new(0.0, 1.0),
            ShapePoint::new(0.5, 1.0),
            ShapePoint::new(0.5, -1.0),
            ShapePoint::new(1.0, -1.0),
        ]);
        let value = osc.step(TIME_STEP);
        assert!(
            (value - last).abs() < 0.2,
            "reshape should not jump: {last} -> {value}"
        );
    }

    #[test]
    fn additive_matches_explicit_partials() {
        let mut bank = Additive::new(3, 1.0);
        let mut p1 = Sine::new(1.0);
        let mut p2 = Sine::new(2.0);
        let mut p3 = Sine::new(3.0);
        let samples_per_cycle = (bank.frequency / TIME_STEP) as usize;
        for _ in 0..samples_per_cycle {
            let expected = p1.step(TIME_STEP)
                + (p2.step(TIME_STEP) / 2.0)
                + (p3.step(TIME_STEP) / 3.0);
            let actual = bank.step(TIME_STEP);
            assert!((actual - expected).abs() < 0.001);
        }
    }
}
