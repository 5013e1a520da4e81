//! Low-level DSP primitives stepped one sample at a time.
//!
//! These components are allocation-free in their steady state and realtime-safe,
//! making them safe to embed directly inside voice patches. They intentionally
//! stay focused on the signal-processing math so the graph layer can handle
//! wiring and modulation.

/// Variable-length delay line with fractional-sample interpolation.
pub mod delay;
/// Envelope state machines and edge detectors.
pub mod envelope;
/// Constant and noise signal sources.
pub mod generator;
/// Periodic waveform sources.
pub mod oscillator;
/// Single-sample signal transforms.
pub mod processor;

pub use delay::{Delay, LocationUnit, Resolution, WriteOp};
pub use envelope::{Ad, Adsr, EnvelopeStage, FallingEdge, RisingEdge};
pub use generator::{BrownNoise, Dc, OutputRange, PinkNoise, WhiteNoise};
