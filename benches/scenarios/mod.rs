//! Whole-voice and whole-engine scenario benchmarks.
//!
//! These model actual usage: single voices of the built-in patches, and
//! the full engine rendering buffers with notes held.

mod engine;
mod patches;

pub use engine::bench_engine;
pub use patches::bench_patches;
