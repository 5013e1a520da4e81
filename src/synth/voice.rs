use crate::MAX_VOICES;

/// Equal-tempered frequency of a (possibly fractional) note number, with
/// A4 = note 69 = 440 Hz.
pub fn note_to_frequency(note: f32) -> f32 {
    440.0 * ((note - 69.0) / 12.0).exp2()
}

/// One polyphony slot.
///
/// A voice with zero velocity is silent and up for reallocation; patches
/// see the zero velocity and let their envelopes release. The note is kept
/// around so a retrigger of the same note can resume smoothly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Voice {
    pub note: Option<u8>,
    pub frequency: f32,
    pub velocity: f32,
    recency: u64,
}

impl Voice {
    pub fn is_silent(&self) -> bool {
        self.velocity <= 0.0
    }
}

/// The fixed bank of voices and the policy that hands them out.
///
/// All [`MAX_VOICES`] slots exist at all times; the polyphony limit only
/// bounds which slots notes can land on and which are summed into the
/// output.
pub struct VoicePool {
    voices: [Voice; MAX_VOICES],
    polyphony: usize,
    counter: u64,
}

impl VoicePool {
    pub fn new() -> Self {
        Self {
            voices: [Voice::default(); MAX_VOICES],
            polyphony: MAX_VOICES,
            counter: 0,
        }
    }

    pub fn polyphony(&self) -> usize {
        self.polyphony
    }

    pub fn set_polyphony(&mut self, polyphony: usize) {
        self.polyphony = polyphony.clamp(1, MAX_VOICES);
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// The voices the render loop sums.
    pub fn active_slots(&self) -> &[Voice] {
        &self.voices[..self.polyphony]
    }

    /// Pick the slot for a new note: the longest-silent voice when one is
    /// free, otherwise steal the least recently allocated playing voice.
    fn allocate(&mut self) -> usize {
        let in_use = &self.voices[..self.polyphony];
        let index = in_use
            .iter()
            .enumerate()
            .filter(|(_, voice)| voice.is_silent())
            .min_by_key(|(_, voice)| voice.recency)
            .or_else(|| in_use.iter().enumerate().min_by_key(|(_, v)| v.recency))
            .map(|(index, _)| index)
            .unwrap_or(0);
        self.voices[index].recency = self.counter;
        self.counter += 1;
        index
    }

    /// Start a note, returning the slot it landed on. `bend` is the current
    /// pitch bend in semitones, folded into the stored frequency.
    pub fn note_on(&mut self, note: u8, velocity: f32, bend: f32) -> usize {
        let index = self.allocate();
        let voice = &mut self.voices[index];
        voice.note = Some(note);
        voice.frequency = note_to_frequency(note as f32 + bend);
        voice.velocity = velocity;
        index
    }

    /// Silence every voice playing the note. The voices themselves keep
    /// their state so their patches can ring out.
    pub fn note_off(&mut self, note: u8) {
        for voice in &mut self.voices {
            if voice.note == Some(note) {
                voice.velocity = 0.0;
            }
        }
    }

    /// Update the velocity of every sounding voice playing the note.
    /// Zero pressure is ignored rather than treated as a note off.
    pub fn pressure(&mut self, note: u8, pressure: f32) {
        if pressure <= 0.0 {
            return;
        }
        for voice in &mut self.voices {
            if voice.note == Some(note) && !voice.is_silent() {
                voice.velocity = pressure;
            }
        }
    }

    /// Retune every sounding voice to its note plus `bend` semitones.
    pub fn apply_bend(&mut self, bend: f32) {
        for voice in &mut self.voices {
            if let Some(note) = voice.note {
                if !voice.is_silent() {
                    voice.frequency = note_to_frequency(note as f32 + bend);
                }
            }
        }
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}
