pub mod dsp;
pub mod graph; // Composable signal graph evaluated per voice
pub mod patch;
pub mod patches; // Built-in patch programs
pub mod synth; // Voice pool, events and the render engine

/// The number of voices every patch is instantiated for.
pub const MAX_VOICES: usize = 64;

/// The number of continuous controller slots shared with every voice.
pub const CV_COUNT: usize = 120;

/// Controller values in the range 0.0 to 1.0, indexed by controller number.
pub type ControlValues = [f32; CV_COUNT];
