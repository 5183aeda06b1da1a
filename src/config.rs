use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub music: MusicConfig,
    #[serde(default)]
    pub range: RangeConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 検出モード ("single" または "multi")
    #[serde(default = "default_mode")]
    pub mode: String,
    /// 目標フレームレート
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// カメラデバイス番号
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// モデルプリセット ("lightning" / "lightning_f16" / "thunder" / "thunder_f16")
    #[serde(default = "default_architecture")]
    pub architecture: String,
    /// 出力ストライド（入力解像度の間引き）
    #[serde(default = "default_output_stride")]
    pub output_stride: u32,
    /// 入力画像のスケール係数 (0.0〜1.0]
    #[serde(default = "default_image_scale_factor")]
    pub image_scale_factor: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfidenceConfig {
    /// ポーズ全体の最小信頼度
    #[serde(default = "default_min_pose")]
    pub min_pose: f32,
    /// 各キーポイントの最小信頼度
    #[serde(default = "default_min_part")]
    pub min_part: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MusicConfig {
    /// コード名（未知の名前はデフォルトセットへフォールバック）
    #[serde(default = "default_chord")]
    pub chord: String,
    /// ノート長（ミリ秒）
    #[serde(default = "default_note_duration_ms")]
    pub note_duration_ms: u64,
    /// 音域下限（MIDIノート番号）
    #[serde(default = "default_note_min")]
    pub note_min: u8,
    /// 音域上限（MIDIノート番号）
    #[serde(default = "default_note_max")]
    pub note_max: u8,
    /// MIDIチャンネル (0〜15)
    #[serde(default)]
    pub channel: u8,
    /// MIDIプログラム番号 (0〜127)
    #[serde(default)]
    pub instrument: u8,
    /// 優先するMIDIポート名の部分文字列（空なら自動選択）
    #[serde(default)]
    pub midi_port: String,
    /// セレクタ平滑化係数 (1.0で平滑化なし)
    #[serde(default = "default_smooth_alpha")]
    pub smooth_alpha: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RangeConfig {
    /// 縦方向サブレンジの高さ（フレーム高さに対する比率）
    #[serde(default = "default_range_scale")]
    pub scale: f32,
    /// サブレンジ上端のオフセット（フレーム高さに対する比率）
    #[serde(default = "default_range_offset")]
    pub offset: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    #[serde(default = "default_true")]
    pub video: bool,
    #[serde(default = "default_true")]
    pub points: bool,
    #[serde(default = "default_true")]
    pub skeleton: bool,
    #[serde(default = "default_true")]
    pub zones: bool,
    #[serde(default = "default_true")]
    pub scale_marker: bool,
    #[serde(default = "default_true")]
    pub waveform: bool,
    #[serde(default)]
    pub bounding_box: bool,
}

fn default_mode() -> String { "single".to_string() }
fn default_target_fps() -> u32 { 60 }
fn default_camera_width() -> u32 { 640 }
fn default_camera_height() -> u32 { 480 }
fn default_architecture() -> String { "lightning".to_string() }
fn default_output_stride() -> u32 { 16 }
fn default_image_scale_factor() -> f32 { 0.5 }
fn default_min_pose() -> f32 { 0.15 }
fn default_min_part() -> f32 { 0.1 }
fn default_chord() -> String { "chromatic".to_string() }
fn default_note_duration_ms() -> u64 { 300 }
fn default_note_min() -> u8 { 36 }
fn default_note_max() -> u8 { 84 }
fn default_smooth_alpha() -> f32 { 1.0 }
fn default_range_scale() -> f32 { 0.75 }
fn default_range_offset() -> f32 { 0.05 }
fn default_true() -> bool { true }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            target_fps: default_target_fps(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            architecture: default_architecture(),
            output_stride: default_output_stride(),
            image_scale_factor: default_image_scale_factor(),
        }
    }
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            min_pose: default_min_pose(),
            min_part: default_min_part(),
        }
    }
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            chord: default_chord(),
            note_duration_ms: default_note_duration_ms(),
            note_min: default_note_min(),
            note_max: default_note_max(),
            channel: 0,
            instrument: 0,
            midi_port: String::new(),
            smooth_alpha: default_smooth_alpha(),
        }
    }
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            scale: default_range_scale(),
            offset: default_range_offset(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            video: true,
            points: true,
            skeleton: true,
            zones: true,
            scale_marker: true,
            waveform: true,
            bounding_box: false,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルがなければデフォルト設定で起動
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(_) => Config::default(),
        }
    }
}
