use anyhow::{Context, Result};
use midir::{MidiOutput, MidiOutputConnection};

use super::sink::{MonoVoice, NoteSink, VoiceChange};
use super::synth::SynthState;
use crate::music::{note_to_freq, NoteEvent, NoteRange};

const CLIENT_NAME: &str = "kinetone";

/// 利用可能なMIDI出力ポート名を列挙する
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new(CLIENT_NAME).context("Failed to init MIDI output")?;
    let mut names = Vec::new();
    for port in midi_out.ports() {
        names.push(
            midi_out
                .port_name(&port)
                .unwrap_or_else(|_| "Unknown".to_string()),
        );
    }
    Ok(names)
}

/// ポート名がソフトシンセらしいか
fn looks_like_softsynth(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("fluid")
        || name.contains("timidity")
        || name.contains("microsoft")
        || name.contains("gm")
        || name.contains("synth")
}

/// midir によるMIDI出力シンク
///
/// モノフォニック。ミュートとノート変更でノートオフを送り、
/// ノート長が尽きたら再発音する。Drop時に発音中のノートを解放する。
pub struct MidirSink {
    conn: MidiOutputConnection,
    port_name: String,
    channel: u8,
    voice: MonoVoice,
    synth: SynthState,
}

impl MidirSink {
    /// MIDI出力ポートを開く
    ///
    /// `preferred` が空でなければ名前にそれを含むポートを優先し、
    /// なければソフトシンセらしいポート、それもなければ先頭を選ぶ。
    /// ポートが1つもなければエラー（呼び出し側がConsoleSinkへフォールバック）。
    pub fn open(preferred: &str, channel: u8, instrument: u8, range: NoteRange) -> Result<Self> {
        let midi_out = MidiOutput::new(CLIENT_NAME).context("Failed to init MIDI output")?;
        let ports = midi_out.ports();
        if ports.is_empty() {
            anyhow::bail!("No MIDI output ports found");
        }

        let names: Vec<String> = ports
            .iter()
            .map(|p| {
                midi_out
                    .port_name(p)
                    .unwrap_or_else(|_| "Unknown".to_string())
            })
            .collect();

        let port_idx = if !preferred.is_empty() {
            names
                .iter()
                .position(|n| n.contains(preferred))
                .with_context(|| format!("No MIDI port matching '{}'", preferred))?
        } else {
            names
                .iter()
                .position(|n| looks_like_softsynth(n))
                .unwrap_or(0)
        };

        let port_name = names[port_idx].clone();
        let conn = midi_out
            .connect(&ports[port_idx], "kinetone-out")
            .map_err(|e| anyhow::anyhow!("Failed to connect to MIDI port: {}", e))?;

        let mut sink = Self {
            conn,
            port_name,
            channel: channel & 0x0F,
            voice: MonoVoice::new(range),
            synth: SynthState::new(),
        };
        sink.program_change(instrument);
        Ok(sink)
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn program_change(&mut self, program: u8) {
        let _ = self.conn.send(&[0xC0 | self.channel, program & 0x7F]);
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        let _ = self.conn.send(&[0x90 | self.channel, note & 0x7F, velocity & 0x7F]);
    }

    fn note_off(&mut self, note: u8) {
        let _ = self.conn.send(&[0x80 | self.channel, note & 0x7F, 0]);
    }
}

impl NoteSink for MidirSink {
    fn play(&mut self, event: &NoteEvent) -> Result<()> {
        match self.voice.update(event) {
            VoiceChange::Trigger {
                note,
                velocity,
                released,
            } => {
                if let Some(old) = released {
                    self.note_off(old);
                }
                self.note_on(note, velocity);
                self.synth.set_note(note_to_freq(note), velocity as f32 / 127.0);
            }
            VoiceChange::Release { note } => {
                self.note_off(note);
                self.synth.silence();
            }
            VoiceChange::Sustain | VoiceChange::Silent => {}
        }
        Ok(())
    }

    fn waveform(&self) -> Vec<f32> {
        self.synth.waveform()
    }

    fn name(&self) -> &'static str {
        "midi"
    }
}

impl Drop for MidirSink {
    fn drop(&mut self) {
        if let Some(note) = self.voice.current_note() {
            self.note_off(note);
        }
    }
}
