#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Delay Line
==========

A circular buffer that outputs its input again after a configurable amount
of time. The delay length need not be a whole number of samples: the buffer
is sized to the ceiling of the requested length and a `remainder` records
the fractional part, used to interpolate both the output and the feedback.

Vocabulary
----------

  samples       The delay length in (possibly fractional) samples.

  remainder     How far between two buffer slots the exact read point sits.
                0.0 means the delay is a whole number of samples.

  insert_index  The slot the next input sample is written to. The same slot
                holds the oldest sample in the buffer, which is read just
                before it is overwritten.

  next_feedback The slice of the interpolated feedback sample that belongs
                to the NEXT step. Splitting feedback across two steps this
                way avoids the low-pass smearing a naive interpolated
                feedback tap would cause on fractional lengths.

Resizing
--------

Changing the delay length while signal is in the buffer inevitably makes an
artifact: the content is too long or too short for the new buffer. To reduce
the "zipper" sound, the old content is copied into the new buffer twice,
aligned to its head and to its tail, and the two copies are cross-faded
against each other with a linear taper.

Feedback
--------

By default the fed-back sample is scaled by the `feedback` coefficient. A
patch that needs to shape the feedback path (damping, waveguide reflection)
passes a closure to `step_with` instead, computed fresh each call so it can
read live voice state.
*/

/// How a location in the buffer is specified.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationUnit {
    /// A fraction of the delay length: 0.0 is the oldest sample, 1.0 the newest.
    Phase,
    /// Seconds from the start of the buffer.
    Seconds,
    /// A (possibly fractional) sample index.
    Samples,
}

/// How a location resolves to buffer slots.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Split fractional locations between the two adjacent slots.
    Interpolated,
    /// Round to the single nearest slot.
    Aligned,
}

/// How a tapped-in value modifies the buffer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Set,
    Add,
    Multiply,
}

/// Variable-length delay line with fractional-sample interpolation.
#[derive(Debug, Clone, Default)]
pub struct Delay {
    buffer: Vec<f32>,
    seconds: f32,
    samples: f32,
    remainder: f32,
    next_feedback: f32,
    insert_index: usize,
    /// Coefficient applied to the feedback path by `step`.
    pub feedback: f32,
}

impl Delay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_length(length: f32, unit: LocationUnit, time_step: f32) -> Self {
        let mut delay = Self::default();
        delay.set_length(length, unit, Resolution::Interpolated, time_step);
        delay
    }

    /// The delay length in the requested unit.
    pub fn length(&self, unit: LocationUnit) -> f32 {
        match unit {
            LocationUnit::Samples => self.samples,
            _ => self.seconds,
        }
    }

    /// Change the delay length, cross-fading the existing content into a
    /// time-shifted copy of itself to soften the transition. `Phase` lengths
    /// are meaningless here and are treated as seconds.
    pub fn set_length(
        &mut self,
        length: f32,
        unit: LocationUnit,
        resolution: Resolution,
        time_step: f32,
    ) {
        match unit {
            LocationUnit::Samples => {
                self.samples = length;
                self.seconds = self.samples * time_step;
            }
            LocationUnit::Seconds | LocationUnit::Phase => {
                self.seconds = length;
                self.samples = self.seconds / time_step;
            }
        }
        if resolution == Resolution::Aligned {
            self.samples = self.samples.round();
        }
        if !(self.samples > 0.0) {
            self.buffer.clear();
            self.insert_index = 0;
            self.samples = 0.0;
            self.remainder = 0.0;
            self.seconds = 0.0;
            return;
        }
        let new_len = self.samples.ceil() as usize;
        self.remainder = (1.0 - (new_len as f32 - self.samples)) % 1.0;
        let old_len = self.buffer.len();
        if new_len == old_len {
            return;
        }
        let mut new_buffer = vec![0.0f32; new_len];
        if old_len == 0 {
            self.buffer = new_buffer;
            self.insert_index = 0;
            return;
        }
        // re-align the old content so the oldest sample sits at index 0
        self.buffer.rotate_left(self.insert_index);
        // fade between a head-aligned and a tail-aligned copy of the old
        // content; when growing, the taper only starts where the copies
        // begin to overlap
        let (taper_step, non_overlap) = if new_len > old_len {
            let overlap = new_len.saturating_sub(2 * (new_len - old_len));
            (1.0 / (overlap + 1) as f32, old_len - overlap)
        } else if new_len > 1 {
            (1.0 / (new_len - 1) as f32, 0)
        } else {
            (0.0, 0)
        };
        let count = old_len.min(new_len);
        let mut taper = 1.0f32;
        for i in 0..count {
            new_buffer[i] += self.buffer[i] * taper;
            new_buffer[new_len - 1 - i] += self.buffer[old_len - 1 - i] * taper;
            if i + 1 >= non_overlap {
                taper -= taper_step;
            }
        }
        self.buffer = new_buffer;
        self.insert_index = 0;
    }

    /// Resolve a location to a fractional buffer index, 0.0 at the oldest
    /// sample.
    fn index_at(&self, location: f32, unit: LocationUnit, resolution: Resolution) -> f32 {
        let base = self.insert_index as f32 + self.remainder;
        let mut index = match unit {
            LocationUnit::Samples => (base + location) % self.samples,
            LocationUnit::Seconds | LocationUnit::Phase => {
                let phase = match unit {
                    LocationUnit::Seconds => location / self.seconds,
                    _ => location,
                };
                let phase = phase.clamp(0.0, 1.0);
                (base + (phase * (self.samples - 1.0))) % self.samples
            }
        };
        if resolution == Resolution::Aligned {
            index = index.round();
        }
        index
    }

    /// Write a value into the buffer at an arbitrary location.
    ///
    /// Interpolated writes distribute the value between the two adjacent
    /// slots; note the distribution is lossy, so a `tap_out` at the same
    /// location will generally not read the same value back.
    pub fn tap_in(
        &mut self,
        location: f32,
        value: f32,
        unit: LocationUnit,
        resolution: Resolution,
        op: WriteOp,
    ) {
        if self.buffer.is_empty() || value == 0.0 {
            return;
        }
        let len = self.buffer.len();
        let index = self.index_at(location, unit, resolution);
        let mut prev = index.floor() as isize;
        if prev < 0 {
            prev += len as isize;
        }
        let prev = prev as usize;
        let next = (index.ceil() as usize) % len;
        if next == prev {
            match op {
                WriteOp::Add => self.buffer[prev] += value,
                WriteOp::Multiply => self.buffer[prev] *= value,
                WriteOp::Set => self.buffer[prev] = value,
            }
        } else {
            let mix = index - index.floor();
            match op {
                WriteOp::Add => {
                    self.buffer[prev] += value * (1.0 - mix);
                    self.buffer[next] += value * mix;
                }
                WriteOp::Multiply => {
                    self.buffer[prev] *= value * (1.0 - mix);
                    self.buffer[next] *= value * mix;
                }
                WriteOp::Set => {
                    self.buffer[prev] = value * (1.0 - mix);
                    self.buffer[next] = value * mix;
                }
            }
        }
    }

    /// Read the buffer at an arbitrary location without disturbing it.
    pub fn tap_out(&self, location: f32, unit: LocationUnit, resolution: Resolution) -> f32 {
        if self.buffer.is_empty() {
            return 0.0;
        }
        let len = self.buffer.len();
        let index = self.index_at(location, unit, resolution);
        let mut prev = index.floor() as isize;
        if prev < 0 {
            prev += len as isize;
        }
        let prev = prev as usize;
        let next = (index.ceil() as usize) % len;
        if next == prev {
            self.buffer[prev]
        } else {
            let mix = index - index.floor();
            (self.buffer[prev] * (1.0 - mix)) + (self.buffer[next] * mix)
        }
    }

    /// Advance by one sample with the default coefficient feedback.
    pub fn step(&mut self, input: f32) -> f32 {
        let feedback = self.feedback;
        self.step_with(input, |v| v * feedback)
    }

    /// Advance by one sample, shaping the feedback path with `op`.
    pub fn step_with(&mut self, input: f32, mut op: impl FnMut(f32) -> f32) -> f32 {
        // with no delay configured, pass the signal through
        if self.buffer.is_empty() {
            return input;
        }
        let len = self.buffer.len();
        let curr = self.buffer[self.insert_index];
        let next_index = (self.insert_index + 1) % len;
        let next = self.buffer[next_index];
        let out = curr + ((next - curr) * self.remainder);
        let fed = input + op(self.next_feedback + (curr * (1.0 - self.remainder)));
        self.next_feedback = next * self.remainder;
        self.buffer[self.insert_index] = fed;
        self.insert_index = next_index;
        out
    }
}
