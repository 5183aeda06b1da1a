use anyhow::Result;
use std::time::{Duration, Instant};

use super::synth::SynthState;
use crate::music::{note_to_freq, quantize_pitch, quantize_velocity, NoteEvent, NoteRange};

/// 音の出力先
///
/// フレームループは量子化前のセレクタ値を持つ `NoteEvent` を渡し、
/// 量子化と発音管理はシンク側が行う。`waveform` は可視化用の
/// 現在の振幅サンプルを返す。
pub trait NoteSink {
    fn play(&mut self, event: &NoteEvent) -> Result<()>;
    fn waveform(&self) -> Vec<f32>;
    fn name(&self) -> &'static str;
}

impl<S: NoteSink + ?Sized> NoteSink for Box<S> {
    fn play(&mut self, event: &NoteEvent) -> Result<()> {
        (**self).play(event)
    }
    fn waveform(&self) -> Vec<f32> {
        (**self).waveform()
    }
    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// モノフォニックボイスの状態遷移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceChange {
    /// 同じノートの継続
    Sustain,
    /// 新しいノートを発音（`released` は先に解放すべき旧ノート）
    Trigger {
        note: u8,
        velocity: u8,
        released: Option<u8>,
    },
    /// 現在のノートを解放して無音へ
    Release { note: u8 },
    /// 既に無音
    Silent,
}

/// モノフォニックボイス管理
///
/// 同一ノートはノート長が尽きるまで持続し、尽きたら再発音する。
/// ノートが変わったとき・ミュートのときは旧ノートを解放する。
pub struct MonoVoice {
    range: NoteRange,
    note: Option<u8>,
    off_at: Instant,
}

impl MonoVoice {
    pub fn new(range: NoteRange) -> Self {
        Self {
            range,
            note: None,
            off_at: Instant::now(),
        }
    }

    pub fn update(&mut self, event: &NoteEvent) -> VoiceChange {
        self.update_at(event, Instant::now())
    }

    pub fn update_at(&mut self, event: &NoteEvent, now: Instant) -> VoiceChange {
        if event.is_mute() {
            return match self.note.take() {
                Some(note) => VoiceChange::Release { note },
                None => VoiceChange::Silent,
            };
        }

        let note = quantize_pitch(event.pitch_selector, self.range, &event.chord);
        let velocity = quantize_velocity(event.velocity_selector);

        if self.note == Some(note) && now < self.off_at {
            return VoiceChange::Sustain;
        }

        let released = self.note;
        self.note = Some(note);
        self.off_at = now + Duration::from_millis(event.duration_ms);
        VoiceChange::Trigger {
            note,
            velocity,
            released,
        }
    }

    pub fn current_note(&self) -> Option<u8> {
        self.note
    }
}

/// ノートイベントを標準出力へ流すシンク
///
/// シミュレーションモードのデフォルト出力。MIDIポートが見つからない
/// ときのフォールバックにも使う。
pub struct ConsoleSink {
    voice: MonoVoice,
    synth: SynthState,
}

impl ConsoleSink {
    pub fn new(range: NoteRange) -> Self {
        Self {
            voice: MonoVoice::new(range),
            synth: SynthState::new(),
        }
    }
}

impl NoteSink for ConsoleSink {
    fn play(&mut self, event: &NoteEvent) -> Result<()> {
        match self.voice.update(event) {
            VoiceChange::Trigger { note, velocity, .. } => {
                println!("note on : {:3} vel {:3} ({})", note, velocity, event.chord.name);
                self.synth.set_note(note_to_freq(note), velocity as f32 / 127.0);
            }
            VoiceChange::Release { note } => {
                println!("note off: {:3}", note);
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
        "console"
    }
}
