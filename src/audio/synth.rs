/// 波形オーバーレイ用のモノフォニック合成状態
///
/// 実際の発音はMIDI側のシンセサイザに任せ、ここでは現在のノートに
/// 対応する振幅サンプルを可視化用に合成するだけ。
pub struct SynthState {
    freq: f32,
    amplitude: f32,
}

/// 可視化用サンプル数
pub const WAVEFORM_SAMPLES: usize = 256;
/// 可視化用サンプリングレート (Hz)
const SAMPLE_RATE: f32 = 8000.0;

impl SynthState {
    pub fn new() -> Self {
        Self {
            freq: 0.0,
            amplitude: 0.0,
        }
    }

    /// 現在のノートを設定 (amplitude は 0.0〜1.0)
    pub fn set_note(&mut self, freq: f32, amplitude: f32) {
        self.freq = freq.max(0.0);
        self.amplitude = amplitude.clamp(0.0, 1.0);
    }

    /// 無音にする
    pub fn silence(&mut self) {
        self.amplitude = 0.0;
    }

    pub fn is_silent(&self) -> bool {
        self.amplitude == 0.0 || self.freq == 0.0
    }

    /// 現在の振幅サンプルを合成して返す
    pub fn waveform(&self) -> Vec<f32> {
        if self.is_silent() {
            return vec![0.0; WAVEFORM_SAMPLES];
        }
        (0..WAVEFORM_SAMPLES)
            .map(|k| {
                let t = k as f32 / SAMPLE_RATE;
                self.amplitude * (2.0 * std::f32::consts::PI * self.freq * t).sin()
            })
            .collect()
    }
}

impl Default for SynthState {
    fn default() -> Self {
        Self::new()
    }
}
