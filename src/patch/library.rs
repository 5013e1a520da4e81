//! The built-in patch registry.

use std::collections::HashMap;

use super::{PatchBuilder, PatchSource, PatchUnit, VoicePatch};
use crate::MAX_VOICES;

/// Constructs one voice of a patch at the given time step.
pub type VoiceFactory = fn(time_step: f32) -> Box<dyn VoicePatch>;

/// Maps patch names to voice factories.
///
/// A library builds every unit at full polyphony; the engine's polyphony
/// limit decides how many of the voices are actually driven.
pub struct PatchLibrary {
    factories: HashMap<String, VoiceFactory>,
}

impl PatchLibrary {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A library holding every built-in patch.
    pub fn with_builtins() -> Self {
        let mut library = Self::new();
        library.register("beep", crate::patches::beep::voice);
        library.register("noise", crate::patches::noise::voice);
        library.register("squiangle", crate::patches::squiangle::voice);
        library.register("pwm-strings", crate::patches::pwm_strings::voice);
        library.register("rough-fm-bass", crate::patches::rough_fm_bass::voice);
        library.register("distorted-fifths", crate::patches::distorted_fifths::voice);
        library.register("hammered-strings", crate::patches::hammered_strings::voice);
        library
    }

    pub fn register(&mut self, name: impl Into<String>, factory: VoiceFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for PatchLibrary {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl PatchBuilder for PatchLibrary {
    fn build(&self, source: &PatchSource, time_step: f32) -> PatchUnit {
        match self.factories.get(&source.name) {
            Some(factory) => {
                let voices = (0..MAX_VOICES).map(|_| factory(time_step)).collect();
                PatchUnit::new(source.clone(), voices)
            }
            None => PatchUnit::rejected(
                source.clone(),
                vec![format!("unknown patch: {}", source.name)],
            ),
        }
    }
}
