use crate::mapping::{AxisReading, NormalizedPosition};

/// EMAベースのセレクタ平滑化フィルタ
///
/// 成分ごとのEMAで手首ジッタによるノート再トリガを抑える。
/// alpha = 1.0 で平滑化なし（デフォルト）。
pub struct Smoother {
    alpha: f32,
    prev: Option<NormalizedPosition>,
}

impl Smoother {
    pub fn new(alpha: f32) -> Self {
        let alpha = if alpha.is_finite() {
            alpha.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Self { alpha, prev: None }
    }

    fn lerp(alpha: f32, current: f32, prev: f32) -> f32 {
        alpha * current + (1.0 - alpha) * prev
    }

    fn apply_axis(alpha: f32, current: &AxisReading, prev: &AxisReading) -> AxisReading {
        AxisReading {
            vertical: Self::lerp(alpha, current.vertical, prev.vertical),
            horizontal: Self::lerp(alpha, current.horizontal, prev.horizontal),
        }
    }

    pub fn apply(&mut self, pos: NormalizedPosition) -> NormalizedPosition {
        let prev = match self.prev {
            Some(prev) => prev,
            None => {
                // 初回フレームはそのまま通す
                self.prev = Some(pos);
                return pos;
            }
        };

        let result = NormalizedPosition {
            right: Self::apply_axis(self.alpha, &pos.right, &prev.right),
            left: Self::apply_axis(self.alpha, &pos.left, &prev.left),
        };
        self.prev = Some(result);
        result
    }

    /// 履歴を破棄。ミュートやモデルリロードの後に呼ぶ
    pub fn reset(&mut self) {
        self.prev = None;
    }
}
