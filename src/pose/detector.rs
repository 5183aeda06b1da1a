use anyhow::{Context, Result};
use ndarray::Array4;
use opencv::core::Mat;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::estimator::{InferenceOptions, ModelArch, PoseEstimator};
use super::keypoint::{Keypoint, KeypointIndex, Pose};
use super::preprocess::{effective_input_size, preprocess_frame};

/// マルチポーズ用モデル（最大6人、[1, 6, 56] 出力）
const MULTIPOSE_MODEL_PATH: &str = "models/movenet_multipose_lightning.onnx";
const MULTIPOSE_INPUT_SIZE: u32 = 256;
const MULTIPOSE_MAX_INSTANCES: usize = 6;

/// MoveNet を使用した姿勢検出器
///
/// シングルポーズ用セッションはプリセット選択に従い、
/// マルチポーズ用セッションは初回要求時に遅延ロードする。
/// `reload` は旧セッションを解放してから新セッションを構築する。
pub struct MoveNetDetector {
    arch: ModelArch,
    session: Option<Session>,
    multi_session: Option<Session>,
}

impl MoveNetDetector {
    /// 検出器を作成する。セッションのロードは `reload` が行う
    /// （フレームループの LoadingModel 遷移に対応）。
    pub fn new(arch: ModelArch) -> Self {
        Self {
            arch,
            session: None,
            multi_session: None,
        }
    }

    pub fn arch(&self) -> ModelArch {
        self.arch
    }

    fn load_session<P: AsRef<Path>>(path: P) -> Result<Session> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(path.as_ref())
            .with_context(|| format!("Failed to load ONNX model: {}", path.as_ref().display()))?;
        Ok(session)
    }

    /// セッションを実行してf32の出力テンソルを取り出す
    fn run_session(session: &mut Session, input: Array4<f32>) -> Result<ndarray::ArrayD<f32>> {
        let input_name = session.inputs[0].name.clone();
        let output_name = session.outputs[0].name.clone();

        let input_tensor = Tensor::from_array(input)?;
        let outputs = session
            .run(ort::inputs![input_name.as_str() => input_tensor])
            .context("Inference failed")?;

        let output: ndarray::ArrayViewD<f32> = outputs[output_name.as_str()]
            .try_extract_array()
            .context("Failed to extract output tensor")?;
        Ok(output.to_owned())
    }

    fn flip_pose(pose: &mut Pose) {
        for kp in pose.keypoints.iter_mut() {
            kp.x = 1.0 - kp.x;
        }
    }
}

impl PoseEstimator for MoveNetDetector {
    type Frame = Mat;

    /// シングルポーズ推論
    ///
    /// MoveNet の出力は [1, 1, 17, 3] (y, x, confidence)。
    /// ポーズ全体のスコアはキーポイント信頼度の平均。
    fn estimate_single(
        &mut self,
        frame: &Mat,
        opts: &InferenceOptions,
    ) -> Result<Vec<Pose>> {
        let session = self
            .session
            .as_mut()
            .context("Pose model is not loaded")?;

        let side = effective_input_size(
            self.arch.input_size(),
            opts.image_scale_factor,
            opts.output_stride,
        );
        let input = preprocess_frame(frame, side)?;
        let output = Self::run_session(session, input)?;

        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        for i in 0..KeypointIndex::COUNT {
            let y = output[[0, 0, i, 0]];
            let x = output[[0, 0, i, 1]];
            let confidence = output[[0, 0, i, 2]];
            keypoints[i] = Keypoint::new(x, y, confidence);
        }

        let mut pose = Pose::new(keypoints);
        if opts.flip_horizontal {
            Self::flip_pose(&mut pose);
        }
        Ok(vec![pose])
    }

    /// マルチポーズ推論
    ///
    /// MoveNet MultiPose の出力は [1, 6, 56]:
    /// 先頭51要素が (y, x, confidence) x 17、続く4要素がバウンディングボックス、
    /// 末尾がインスタンススコア。スコア0のスロットは返さない。
    fn estimate_multiple(
        &mut self,
        frame: &Mat,
        opts: &InferenceOptions,
    ) -> Result<Vec<Pose>> {
        if self.multi_session.is_none() {
            self.multi_session = Some(Self::load_session(MULTIPOSE_MODEL_PATH)?);
        }
        let session = self
            .multi_session
            .as_mut()
            .context("Multipose model is not loaded")?;

        let side = effective_input_size(
            MULTIPOSE_INPUT_SIZE,
            opts.image_scale_factor,
            opts.output_stride,
        );
        let input = preprocess_frame(frame, side)?;
        let output = Self::run_session(session, input)?;

        let mut poses = Vec::new();
        for inst in 0..MULTIPOSE_MAX_INSTANCES {
            let score = output[[0, inst, 55]];
            if score <= 0.0 {
                continue;
            }

            let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
            for i in 0..KeypointIndex::COUNT {
                let y = output[[0, inst, i * 3]];
                let x = output[[0, inst, i * 3 + 1]];
                let confidence = output[[0, inst, i * 3 + 2]];
                keypoints[i] = Keypoint::new(x, y, confidence);
            }

            let mut pose = Pose::with_score(keypoints, score);
            if opts.flip_horizontal {
                Self::flip_pose(&mut pose);
            }
            poses.push(pose);
        }
        Ok(poses)
    }

    /// モデルの再初期化。旧セッションの解放が先、構築が後
    fn reload(&mut self, arch: ModelArch) -> Result<()> {
        self.session = None;
        self.multi_session = None;

        let session = Self::load_session(arch.model_path())?;
        self.session = Some(session);
        self.arch = arch;
        Ok(())
    }
}
