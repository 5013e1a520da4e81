#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Something the engine should do at a specific frame of the next render.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineEvent {
    /// Offset in frames from the start of the render call. Frames past the
    /// end of the buffer are clamped to the end.
    pub frame: u32,
    pub kind: EventKind,
}

impl EngineEvent {
    pub fn new(frame: u32, kind: EventKind) -> Self {
        Self { frame, kind }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    NotePressure { note: u8, pressure: u8 },
    /// Raw 14-bit bender position, 0x2000 at rest.
    PitchBend { value: u16 },
    Controller { controller: u8, value: u8 },
    SetPolyphony { voices: u8 },
    /// New bend range in semitones.
    SetBendRange { semitones: f32 },
    /// Ask the engine to flag that a state snapshot is wanted.
    StateRequest,
}

/// Scale a raw 14-bit bender position to -1.0..1.0.
///
/// The rest position 0x2000 splits the range unevenly, so sharp and flat
/// use slightly different divisors to reach exactly +/-1.0 at the ends.
pub fn bend_amount(value: u16) -> f32 {
    let centered = (value.min(0x3FFF) as i32 - 0x2000) as f32;
    if centered >= 0.0 {
        centered / 0x1FFF as f32
    } else {
        centered / 0x2000 as f32
    }
}
