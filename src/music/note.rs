use super::chord::ChordIntervals;

/// 出力音域（MIDIノート番号の下限・上限）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteRange {
    pub low: u8,
    pub high: u8,
}

impl NoteRange {
    pub fn new(low: u8, high: u8) -> Self {
        // 逆転した設定は入れ替えて成立させる
        if low <= high {
            Self { low, high }
        } else {
            Self {
                low: high,
                high: low,
            }
        }
    }
}

impl Default for NoteRange {
    fn default() -> Self {
        Self { low: 36, high: 84 }
    }
}

/// フレームごとに生成・破棄される音イベント
///
/// セレクタは[0,1]の連続値で、量子化はオーディオ層が行う。
/// どちらかのセレクタが非正ならミュート。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub pitch_selector: f32,
    pub velocity_selector: f32,
    pub duration_ms: u64,
    pub chord: ChordIntervals,
}

impl NoteEvent {
    pub fn new(
        pitch_selector: f32,
        velocity_selector: f32,
        duration_ms: u64,
        chord: ChordIntervals,
    ) -> Self {
        Self {
            pitch_selector,
            velocity_selector,
            duration_ms,
            chord,
        }
    }

    /// ピッチ・ベロシティともゼロのミュートイベント
    pub fn mute(duration_ms: u64, chord: ChordIntervals) -> Self {
        Self {
            pitch_selector: 0.0,
            velocity_selector: 0.0,
            duration_ms,
            chord,
        }
    }

    pub fn is_mute(&self) -> bool {
        self.pitch_selector <= 0.0 || self.velocity_selector <= 0.0
    }
}

/// ピッチセレクタをコード音程セットで量子化してMIDIノートへ変換
///
/// セレクタを音域に線形に写した上で、許容ノート
/// （`low` をルートとしたコードトーン）のうち最も近いものを選ぶ。
/// 同距離なら高い方。セレクタ 1.0 は音域内の最高コードトーン。
pub fn quantize_pitch(selector: f32, range: NoteRange, chord: &ChordIntervals) -> u8 {
    let selector = if selector.is_finite() {
        selector.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let span = (range.high - range.low) as f32;
    let target = range.low as f32 + selector * span;

    let mut best = range.low;
    let mut best_dist = f32::INFINITY;
    for note in range.low..=range.high {
        let offset = (note - range.low) % 12;
        if !chord.offsets.contains(&offset) {
            continue;
        }
        let dist = (note as f32 - target).abs();
        if dist < best_dist || (dist == best_dist && note > best) {
            best = note;
            best_dist = dist;
        }
    }
    best
}

/// ベロシティセレクタをMIDIベロシティ (1〜127) へ変換
pub fn quantize_velocity(selector: f32) -> u8 {
    let selector = if selector.is_finite() {
        selector.clamp(0.0, 1.0)
    } else {
        0.0
    };
    ((selector * 127.0).round() as u8).clamp(1, 127)
}

/// MIDIノート番号を周波数 (Hz) へ変換 (A4 = 69 = 440Hz)
pub fn note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}
