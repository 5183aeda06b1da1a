/// 画面上の軸平行な矩形ゾーン（ピクセル座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Zone {
    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// 境界を含む内外判定
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// 2ゾーンのレイアウトと縦方向のアクティブサブレンジ
///
/// 左半分がピッチゾーン（ユーザーの左手 = 解剖学上の右手首）、
/// 右半分がベロシティゾーン（ユーザーの右手 = 解剖学上の左手首）。
/// ミラー表示のため手とゾーンは交差対応になる。
/// サブレンジはピッチの縦方向計算にのみ使い、ゾーンの内外判定は
/// フレーム全高で行う。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneLayout {
    /// ピッチ（縦方向コントロール）ゾーン = 左半分
    pub pitch: Zone,
    /// ベロシティ（横方向コントロール）ゾーン = 右半分
    pub velocity: Zone,
    /// アクティブサブレンジ上端（ピクセル）
    pub range_top: f32,
    /// アクティブサブレンジ下端（ピクセル）
    pub range_bottom: f32,
}

impl ZoneLayout {
    /// フレーム寸法とサブレンジ設定からレイアウトを構築
    ///
    /// `range_scale` はサブレンジの高さ（フレーム高さ比）、
    /// `range_offset` は上端のオフセット（フレーム高さ比）。
    /// サブレンジは最低1ピクセルの高さを保証する（ゼロ除算防止）。
    pub fn new(frame_width: f32, frame_height: f32, range_scale: f32, range_offset: f32) -> Self {
        let center = frame_width / 2.0;

        let scale = if range_scale.is_finite() {
            range_scale.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let offset = if range_offset.is_finite() {
            range_offset.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let range_top = (frame_height * offset).min(frame_height - 1.0).max(0.0);
        let range_bottom = (range_top + frame_height * scale)
            .min(frame_height)
            .max(range_top + 1.0);

        Self {
            pitch: Zone::new(0.0, center, 0.0, frame_height),
            velocity: Zone::new(center, frame_width, 0.0, frame_height),
            range_top,
            range_bottom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_contains_inclusive_edges() {
        let zone = Zone::new(320.0, 640.0, 0.0, 480.0);
        assert!(zone.contains(320.0, 0.0));
        assert!(zone.contains(640.0, 480.0));
        assert!(!zone.contains(319.9, 240.0));
        assert!(!zone.contains(640.1, 240.0));
    }

    #[test]
    fn test_layout_halves() {
        let layout = ZoneLayout::new(640.0, 480.0, 1.0, 0.0);
        assert_eq!(layout.pitch.left, 0.0);
        assert_eq!(layout.pitch.right, 320.0);
        assert_eq!(layout.velocity.left, 320.0);
        assert_eq!(layout.velocity.right, 640.0);
        assert_eq!(layout.range_top, 0.0);
        assert_eq!(layout.range_bottom, 480.0);
    }

    #[test]
    fn test_layout_subrange() {
        let layout = ZoneLayout::new(640.0, 480.0, 0.5, 0.25);
        assert_eq!(layout.range_top, 120.0);
        assert_eq!(layout.range_bottom, 360.0);
        // 内外判定はフレーム全高のまま
        assert!(layout.pitch.contains(100.0, 470.0));
    }

    #[test]
    fn test_layout_zero_scale_keeps_nonzero_span() {
        let layout = ZoneLayout::new(640.0, 480.0, 0.0, 0.5);
        assert!(layout.range_bottom > layout.range_top);
    }

    #[test]
    fn test_layout_nonfinite_params_fall_back() {
        let layout = ZoneLayout::new(640.0, 480.0, f32::NAN, f32::INFINITY);
        assert_eq!(layout.range_top, 0.0);
        assert_eq!(layout.range_bottom, 480.0);
    }
}
