//! Patch units: the bridge between a named sound and the voices that
//! produce it.
//!
//! A patch is requested by name, built off the audio thread into a
//! [`PatchUnit`] holding one voice processor per polyphony slot, and then
//! handed to the engine, which steps the unit's voices from the render
//! loop. Building never happens on the audio thread; stepping never
//! allocates.

pub mod library;

pub use library::PatchLibrary;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::StepCtx;

/// A single voice's sound generator.
///
/// Implementations hold all per-voice state (oscillator phases, envelope
/// positions, delay buffers) and produce one sample per call. `step` must
/// not allocate; everything a voice needs is built up front.
pub trait VoicePatch: Send {
    fn step(&mut self, ctx: &StepCtx) -> f32;
}

/// A request for a patch, as the caller phrased it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSource {
    pub name: String,
}

impl PatchSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Where in its lifecycle a patch build gave up.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    /// The source could not be resolved into voices at all.
    Build,
    /// Voices were produced but the unit could not be made playable.
    Load,
}

/// A rejected build, kept so the caller can report what went wrong while
/// the previous patch keeps playing.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    pub source: PatchSource,
    pub stage: BuildStage,
    pub diagnostics: Vec<String>,
}

/// A fully built patch: one voice processor per polyphony slot.
pub struct PatchUnit {
    pub source: PatchSource,
    pub built: bool,
    pub loaded: bool,
    pub diagnostics: Vec<String>,
    voices: Vec<Box<dyn VoicePatch>>,
}

impl PatchUnit {
    pub fn new(source: PatchSource, voices: Vec<Box<dyn VoicePatch>>) -> Self {
        Self {
            source,
            built: true,
            loaded: true,
            diagnostics: Vec::new(),
            voices,
        }
    }

    /// A unit representing a failed build. It carries no voices and renders
    /// silence if stepped anyway.
    pub fn rejected(source: PatchSource, diagnostics: Vec<String>) -> Self {
        Self {
            source,
            built: false,
            loaded: false,
            diagnostics,
            voices: Vec::new(),
        }
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn failure_stage(&self) -> Option<BuildStage> {
        if !self.built {
            Some(BuildStage::Build)
        } else if !self.loaded {
            Some(BuildStage::Load)
        } else {
            None
        }
    }

    /// Step one voice. A voice index past the unit's polyphony yields
    /// silence rather than a panic, so the engine can raise its polyphony
    /// limit before a wider patch arrives.
    pub fn step(&mut self, voice: usize, ctx: &StepCtx) -> f32 {
        match self.voices.get_mut(voice) {
            Some(patch) => patch.step(ctx),
            None => 0.0,
        }
    }
}

/// Resolves a [`PatchSource`] into a [`PatchUnit`].
///
/// Builders run on the worker thread and are free to allocate. A failed
/// resolution is reported through the returned unit's flags and
/// diagnostics, never by panicking.
pub trait PatchBuilder: Send {
    fn build(&self, source: &PatchSource, time_step: f32) -> PatchUnit;
}
