/// Fractal Drums - a drum sequencer where every point of a recursively
/// subdivided square is a rhythm
///
/// This library provides the core components:
/// - Quaternary address decoding and nested cell geometry
/// - Pan/zoom viewport over the fractal canvas
/// - Tick-driven playback that reveals one note per step
/// - Level-of-detail grid rendering into a plain scene description
/// - Sample-based audio output and General MIDI drum output

pub mod audio;
pub mod config;
pub mod error;
pub mod fractal;
pub mod midi;
pub mod render;
pub mod sequencer;
pub mod viewport;

// Re-export commonly used types
pub use audio::{AudioOutput, DrumSamples};
pub use config::{DrumKit, GridConfig, TimeSignature};
pub use error::{Error, Result};
pub use fractal::{decode, prefix_box, Address, CellBox, NoteSymbol};
pub use midi::{gm_drum_note, MidiOutputDevice};
pub use render::{render, Scene};
pub use sequencer::clock::FrameClock;
pub use sequencer::playback::{NoteTrigger, PlaybackEngine, PlaybackEvent, Scheduler};
pub use sequencer::Sequencer;
pub use viewport::{Point, Viewport};
