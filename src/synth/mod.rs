//! The event-driven polyphonic engine: voice allocation, sample-accurate
//! event handling, and the background patch build worker.

pub mod engine;
pub mod event;
pub mod voice;
pub mod worker;

#[cfg(feature = "serde")]
pub use engine::EngineSnapshot;
pub use engine::Engine;
pub use event::{bend_amount, EngineEvent, EventKind};
pub use voice::{note_to_frequency, Voice, VoicePool};
pub use worker::{WorkRequest, WorkResponse};
