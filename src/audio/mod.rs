#[cfg(feature = "midi")]
pub mod midi;
pub mod sink;
pub mod synth;

#[cfg(feature = "midi")]
pub use midi::{list_output_ports, MidirSink};
pub use sink::{ConsoleSink, MonoVoice, NoteSink, VoiceChange};
pub use synth::{SynthState, WAVEFORM_SAMPLES};
