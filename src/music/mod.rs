pub mod chord;
pub mod note;

pub use chord::{chord_for, chord_names, ChordIntervals, DEFAULT_CHORD_NAME};
pub use note::{note_to_freq, quantize_pitch, quantize_velocity, NoteEvent, NoteRange};
