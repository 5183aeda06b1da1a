/// MoveNet の 17 キーポイントインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEye),
            2 => Some(Self::RightEye),
            3 => Some(Self::LeftEar),
            4 => Some(Self::RightEar),
            5 => Some(Self::LeftShoulder),
            6 => Some(Self::RightShoulder),
            7 => Some(Self::LeftElbow),
            8 => Some(Self::RightElbow),
            9 => Some(Self::LeftWrist),
            10 => Some(Self::RightWrist),
            11 => Some(Self::LeftHip),
            12 => Some(Self::RightHip),
            13 => Some(Self::LeftKnee),
            14 => Some(Self::RightKnee),
            15 => Some(Self::LeftAnkle),
            16 => Some(Self::RightAnkle),
            _ => None,
        }
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0)
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }

    /// ピクセル座標に変換（描画用の整数座標）
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        let px = (self.x * width as f32) as i32;
        let py = (self.y * height as f32) as i32;
        (px, py)
    }

    /// ピクセル座標に変換（ゾーン判定用の浮動小数点座標）
    pub fn to_pixel_f32(&self, width: f32, height: f32) -> (f32, f32) {
        (self.x * width, self.y * height)
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            confidence: 0.0,
        }
    }
}

/// キーポイント群の外接矩形（正規化座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

/// 17キーポイントからなる姿勢と全体スコア
#[derive(Debug, Clone)]
pub struct Pose {
    pub keypoints: [Keypoint; KeypointIndex::COUNT],
    /// ポーズ全体の信頼度 (0.0〜1.0)
    pub score: f32,
}

impl Pose {
    /// スコアは全キーポイントの平均信頼度から算出
    pub fn new(keypoints: [Keypoint; KeypointIndex::COUNT]) -> Self {
        let sum: f32 = keypoints.iter().map(|k| k.confidence).sum();
        Self {
            keypoints,
            score: sum / KeypointIndex::COUNT as f32,
        }
    }

    /// 検出器が返す全体スコアをそのまま使う場合
    pub fn with_score(keypoints: [Keypoint; KeypointIndex::COUNT], score: f32) -> Self {
        Self { keypoints, score }
    }

    /// インデックスでキーポイントを取得
    pub fn get(&self, index: KeypointIndex) -> &Keypoint {
        &self.keypoints[index as usize]
    }

    /// 両手首 (解剖学上の左手首, 右手首)
    pub fn wrists(&self) -> (&Keypoint, &Keypoint) {
        (
            self.get(KeypointIndex::LeftWrist),
            self.get(KeypointIndex::RightWrist),
        )
    }

    /// 閾値以上のキーポイントから外接矩形を算出（マルチポーズ描画用）
    pub fn bounding_box(&self, threshold: f32) -> Option<BBox> {
        let mut bbox: Option<BBox> = None;
        for kp in self.keypoints.iter().filter(|k| k.is_valid(threshold)) {
            bbox = Some(match bbox {
                Some(b) => BBox {
                    min_x: b.min_x.min(kp.x),
                    min_y: b.min_y.min(kp.y),
                    max_x: b.max_x.max(kp.x),
                    max_y: b.max_y.max(kp.y),
                },
                None => BBox {
                    min_x: kp.x,
                    min_y: kp.y,
                    max_x: kp.x,
                    max_y: kp.y,
                },
            });
        }
        bbox
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            keypoints: [Keypoint::default(); KeypointIndex::COUNT],
            score: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_index_from_index() {
        assert_eq!(KeypointIndex::from_index(9), Some(KeypointIndex::LeftWrist));
        assert_eq!(KeypointIndex::from_index(10), Some(KeypointIndex::RightWrist));
        assert_eq!(KeypointIndex::from_index(17), None);
    }

    #[test]
    fn test_keypoint_is_valid() {
        let kp = Keypoint::new(0.5, 0.5, 0.7);
        assert!(kp.is_valid(0.5));
        assert!(!kp.is_valid(0.8));
    }

    #[test]
    fn test_keypoint_to_pixel_f32() {
        let kp = Keypoint::new(0.5, 0.25, 1.0);
        let (px, py) = kp.to_pixel_f32(640.0, 480.0);
        assert_eq!(px, 320.0);
        assert_eq!(py, 120.0);
    }

    #[test]
    fn test_pose_score_is_average_confidence() {
        let keypoints = [Keypoint::new(0.0, 0.0, 0.5); KeypointIndex::COUNT];
        let pose = Pose::new(keypoints);
        assert!((pose.score - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_pose_wrists() {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        keypoints[KeypointIndex::LeftWrist as usize] = Keypoint::new(0.8, 0.4, 0.9);
        keypoints[KeypointIndex::RightWrist as usize] = Keypoint::new(0.2, 0.6, 0.8);
        let pose = Pose::new(keypoints);
        let (lw, rw) = pose.wrists();
        assert_eq!(lw.x, 0.8);
        assert_eq!(rw.x, 0.2);
    }

    #[test]
    fn test_bounding_box_ignores_low_confidence() {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        keypoints[0] = Keypoint::new(0.2, 0.3, 0.9);
        keypoints[1] = Keypoint::new(0.6, 0.7, 0.9);
        keypoints[2] = Keypoint::new(0.95, 0.95, 0.01);
        let pose = Pose::new(keypoints);
        let bbox = pose.bounding_box(0.5).unwrap();
        assert_eq!(bbox.min_x, 0.2);
        assert_eq!(bbox.max_x, 0.6);
        assert_eq!(bbox.max_y, 0.7);
    }

    #[test]
    fn test_bounding_box_none_when_all_low() {
        let pose = Pose::default();
        assert!(pose.bounding_box(0.5).is_none());
    }
}
