use anyhow::Result;

use crate::pose::{InferenceOptions, Keypoint, KeypointIndex, ModelArch, Pose, PoseEstimator};

/// スクリプト駆動の疑似姿勢推定器
///
/// カメラもモデルも使わず、両手首を位相をずらした正弦波で掃引する。
/// デフォルトビルド（シミュレーションモード）の楽器として、
/// またフレームループの動作確認用に使う。
pub struct SimulatedEstimator {
    t: f32,
    step: f32,
    arch: ModelArch,
}

/// 手首以外のキーポイントに与える低信頼度
const BACKGROUND_CONFIDENCE: f32 = 0.3;
/// 手首の信頼度
const WRIST_CONFIDENCE: f32 = 0.95;

impl SimulatedEstimator {
    /// `step` は1ティックあたりの位相の進み（ラジアン）
    pub fn new(step: f32) -> Self {
        Self {
            t: 0.0,
            step,
            arch: ModelArch::Lightning,
        }
    }

    pub fn arch(&self) -> ModelArch {
        self.arch
    }

    fn scripted_pose(&self) -> Pose {
        let mut keypoints = [Keypoint::new(0.5, 0.5, BACKGROUND_CONFIDENCE); KeypointIndex::COUNT];

        // ユーザーの左手（解剖学上の右手首）: ピッチゾーン内を上下に掃引
        let pitch_y = 0.5 + 0.45 * self.t.sin();
        keypoints[KeypointIndex::RightWrist as usize] =
            Keypoint::new(0.25, pitch_y, WRIST_CONFIDENCE);

        // ユーザーの右手（解剖学上の左手首）: ベロシティゾーン内を左右に掃引
        let velocity_x = 0.75 + 0.24 * (self.t * 0.7).cos();
        keypoints[KeypointIndex::LeftWrist as usize] =
            Keypoint::new(velocity_x, 0.5, WRIST_CONFIDENCE);

        Pose::new(keypoints)
    }
}

impl PoseEstimator for SimulatedEstimator {
    type Frame = ();

    fn estimate_single(&mut self, _: &(), _: &InferenceOptions) -> Result<Vec<Pose>> {
        self.t += self.step;
        Ok(vec![self.scripted_pose()])
    }

    fn estimate_multiple(&mut self, frame: &(), opts: &InferenceOptions) -> Result<Vec<Pose>> {
        self.estimate_single(frame, opts)
    }

    fn reload(&mut self, arch: ModelArch) -> Result<()> {
        self.arch = arch;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrists_stay_in_their_zones() {
        let mut sim = SimulatedEstimator::new(0.1);
        let opts = InferenceOptions::default();
        for _ in 0..200 {
            let poses = sim.estimate_single(&(), &opts).unwrap();
            let (lw, rw) = poses[0].wrists();
            // 左手首（ユーザー右手）は右半分、右手首（ユーザー左手）は左半分
            assert!(lw.x >= 0.5 && lw.x <= 1.0);
            assert!(rw.x <= 0.5);
            assert!(rw.y >= 0.0 && rw.y <= 1.0);
        }
    }

    #[test]
    fn test_wrist_confidence_above_defaults() {
        let mut sim = SimulatedEstimator::new(0.1);
        let poses = sim
            .estimate_single(&(), &InferenceOptions::default())
            .unwrap();
        let (lw, rw) = poses[0].wrists();
        assert!(lw.is_valid(0.1));
        assert!(rw.is_valid(0.1));
        assert!(poses[0].score >= 0.15);
    }

    #[test]
    fn test_reload_records_arch() {
        let mut sim = SimulatedEstimator::new(0.1);
        sim.reload(ModelArch::Thunder).unwrap();
        assert_eq!(sim.arch(), ModelArch::Thunder);
    }
}
