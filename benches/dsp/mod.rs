//! Benchmarks for low-level DSP primitives.

mod delay;
mod envelope;
mod noise;
mod oscillator;

pub use delay::bench_delay;
pub use envelope::bench_envelope;
pub use noise::bench_noise;
pub use oscillator::bench_oscillator;
