//! The built-in patches.
//!
//! Each module exposes a `voice` factory producing one voice of the patch.
//! Some voices are pure signal graphs, some drive dsp primitives directly,
//! and some mix the two; the engine only sees [`crate::patch::VoicePatch`].

/// Plain sine.
pub mod beep;
/// Two clipped sines a fifth apart.
pub mod distorted_fifths;
/// Waveguide pluck with a bouncing echo.
pub mod hammered_strings;
/// Velocity-scaled pink noise.
pub mod noise;
/// Detuned pulse pair with width modulation.
pub mod pwm_strings;
/// Two-operator fm with a growling low ratio.
pub mod rough_fm_bass;
/// Morphing triangle-to-square wave.
pub mod squiangle;
