use anyhow::Result;

use super::keypoint::Pose;

/// MoveNet のモデルプリセット（品質とサイズの4段階）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelArch {
    /// 高速・低精度 (f32)
    Lightning,
    /// 高速・低精度 (f16, 省メモリ)
    LightningF16,
    /// 低速・高精度 (f32)
    Thunder,
    /// 低速・高精度 (f16, 省メモリ)
    ThunderF16,
}

impl ModelArch {
    pub const ALL: [ModelArch; 4] = [
        ModelArch::Lightning,
        ModelArch::LightningF16,
        ModelArch::Thunder,
        ModelArch::ThunderF16,
    ];

    /// 設定文字列から変換。未知の名前は Lightning へフォールバック
    pub fn from_name(name: &str) -> Self {
        match name {
            "lightning_f16" => ModelArch::LightningF16,
            "thunder" => ModelArch::Thunder,
            "thunder_f16" => ModelArch::ThunderF16,
            _ => ModelArch::Lightning,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelArch::Lightning => "lightning",
            ModelArch::LightningF16 => "lightning_f16",
            ModelArch::Thunder => "thunder",
            ModelArch::ThunderF16 => "thunder_f16",
        }
    }

    /// ONNXモデルファイルのパス
    pub fn model_path(&self) -> &'static str {
        match self {
            ModelArch::Lightning => "models/movenet_lightning.onnx",
            ModelArch::LightningF16 => "models/movenet_lightning_f16.onnx",
            ModelArch::Thunder => "models/movenet_thunder.onnx",
            ModelArch::ThunderF16 => "models/movenet_thunder_f16.onnx",
        }
    }

    /// モデルの基準入力解像度（正方形の一辺）
    pub fn input_size(&self) -> u32 {
        match self {
            ModelArch::Lightning | ModelArch::LightningF16 => 192,
            ModelArch::Thunder | ModelArch::ThunderF16 => 256,
        }
    }
}

/// 推論ごとのオプション
#[derive(Debug, Clone, Copy)]
pub struct InferenceOptions {
    /// 入力画像のスケール係数 (0.0〜1.0]
    pub image_scale_factor: f32,
    /// キーポイントX座標を左右反転する（ミラー表示用）
    pub flip_horizontal: bool,
    /// 出力ストライド。大きいほど入力解像度を間引く
    pub output_stride: u32,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            image_scale_factor: 0.5,
            flip_horizontal: true,
            output_stride: 16,
        }
    }
}

/// 姿勢推定器の共通インターフェース
///
/// `reload` は新しいセッションを構築する前に必ず旧セッションを解放する。
/// フレームループはリロード中のフレームを破棄する前提で呼び出す。
pub trait PoseEstimator {
    type Frame;

    /// 単一被写体モード。検出できなければ空を返す
    fn estimate_single(
        &mut self,
        frame: &Self::Frame,
        opts: &InferenceOptions,
    ) -> Result<Vec<Pose>>;

    /// 複数被写体モード
    fn estimate_multiple(
        &mut self,
        frame: &Self::Frame,
        opts: &InferenceOptions,
    ) -> Result<Vec<Pose>>;

    /// モデルを解放して別プリセットで再初期化
    fn reload(&mut self, arch: ModelArch) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_from_name_known() {
        assert_eq!(ModelArch::from_name("thunder"), ModelArch::Thunder);
        assert_eq!(ModelArch::from_name("lightning_f16"), ModelArch::LightningF16);
    }

    #[test]
    fn test_arch_from_name_unknown_falls_back() {
        assert_eq!(ModelArch::from_name("resnet50"), ModelArch::Lightning);
        assert_eq!(ModelArch::from_name(""), ModelArch::Lightning);
    }

    #[test]
    fn test_arch_roundtrip() {
        for arch in ModelArch::ALL {
            assert_eq!(ModelArch::from_name(arch.name()), arch);
        }
    }

    #[test]
    fn test_input_size() {
        assert_eq!(ModelArch::Lightning.input_size(), 192);
        assert_eq!(ModelArch::ThunderF16.input_size(), 256);
    }
}
