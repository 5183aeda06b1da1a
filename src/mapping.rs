use crate::zone::{Zone, ZoneLayout};

/// 1ゾーン分の正規化読み取り値
///
/// ゾーン外のキーポイントは両軸とも 0（「入力なし」）。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisReading {
    /// 縦方向 (サブレンジ下端=0, 上端=1)
    pub vertical: f32,
    /// 横方向 (ゾーン共有境界=0, 外側端=1)
    pub horizontal: f32,
}

/// 両手分の読み取り値
///
/// `right` はユーザーの右手（解剖学上の左手首）、
/// `left` はユーザーの左手（解剖学上の右手首）。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedPosition {
    pub right: AxisReading,
    pub left: AxisReading,
}

impl NormalizedPosition {
    /// ピッチセレクタ: 左手の縦方向読み取り値
    pub fn pitch_selector(&self) -> f32 {
        self.left.vertical
    }

    /// ベロシティセレクタ: 右手の横方向読み取り値
    pub fn velocity_selector(&self) -> f32 {
        self.right.horizontal
    }
}

/// 線形比率 `(value - low) / (high - low)` を非有限値ガード付きで計算
///
/// - `value` または `low` が非有限なら 0
/// - `high` が非有限なら `low + 1` に置き換えて計算を成立させる
///
/// クランプはしない。範囲外の入力は負値や1超になり得る
/// （呼び出し側がミュート判定に使う）。
pub fn compute_percentage(value: f32, low: f32, high: f32) -> f32 {
    if !value.is_finite() || !low.is_finite() {
        return 0.0;
    }
    let high = if high.is_finite() { high } else { low + 1.0 };
    (value - low) / (high - low)
}

/// ゾーン1つ分の読み取り値を計算
///
/// `inner_x` は2ゾーンの共有境界側、`outer_x` は外側端。
/// 横方向は共有境界から離れるほど 1 に近づく向き。
/// 縦方向はサブレンジ下端→上端で 0→1。上端より上は 1.0 で頭打ち、
/// 下端より下は負値になる（ミュート扱い）。
fn zone_reading(x: f32, y: f32, zone: &Zone, inner_x: f32, outer_x: f32, layout: &ZoneLayout) -> AxisReading {
    let mut reading = AxisReading::default();
    if !zone.contains(x, y) {
        return reading;
    }

    reading.horizontal = compute_percentage(x, inner_x, outer_x);
    reading.vertical =
        compute_percentage(y, layout.range_bottom, layout.range_top).min(1.0);
    reading
}

/// 両手首のピクセル座標から正規化位置を導出する（ゾーンマッパー本体）
///
/// ミラー表示のため解剖学上の左手首がユーザーの右手を表す。
/// 右手はベロシティゾーン（右半分）、左手はピッチゾーン（左半分）で読む。
/// 純粋関数であり、状態はゾーンジオメトリのみ。
pub fn normalize_positions(
    left_wrist: (f32, f32),
    right_wrist: (f32, f32),
    layout: &ZoneLayout,
) -> NormalizedPosition {
    // ユーザーの右手 = 解剖学上の左手首 → ベロシティゾーン
    // 共有境界はベロシティゾーンの左端
    let right = zone_reading(
        left_wrist.0,
        left_wrist.1,
        &layout.velocity,
        layout.velocity.left,
        layout.velocity.right,
        layout,
    );

    // ユーザーの左手 = 解剖学上の右手首 → ピッチゾーン
    // 共有境界はピッチゾーンの右端
    let left = zone_reading(
        right_wrist.0,
        right_wrist.1,
        &layout.pitch,
        layout.pitch.right,
        layout.pitch.left,
        layout,
    );

    NormalizedPosition { right, left }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::ZoneLayout;

    fn full_layout() -> ZoneLayout {
        ZoneLayout::new(640.0, 480.0, 1.0, 0.0)
    }

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_compute_percentage_endpoints() {
        assert_eq!(compute_percentage(0.0, 0.0, 10.0), 0.0);
        assert_eq!(compute_percentage(10.0, 0.0, 10.0), 1.0);
        assert_eq!(compute_percentage(5.0, 0.0, 10.0), 0.5);
    }

    #[test]
    fn test_compute_percentage_monotonic() {
        let mut prev = compute_percentage(0.0, 0.0, 10.0);
        for i in 1..=10 {
            let next = compute_percentage(i as f32, 0.0, 10.0);
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_compute_percentage_inverted_bounds() {
        // low > high でも線形（横軸の外向き計算に使う）
        assert_eq!(compute_percentage(320.0, 320.0, 0.0), 0.0);
        assert_eq!(compute_percentage(0.0, 320.0, 0.0), 1.0);
        assert_eq!(compute_percentage(160.0, 320.0, 0.0), 0.5);
    }

    #[test]
    fn test_compute_percentage_nonfinite_value_or_low() {
        assert_eq!(compute_percentage(f32::NAN, 0.0, 10.0), 0.0);
        assert_eq!(compute_percentage(f32::INFINITY, 0.0, 10.0), 0.0);
        assert_eq!(compute_percentage(5.0, f32::NAN, 10.0), 0.0);
        assert_eq!(compute_percentage(5.0, f32::NEG_INFINITY, 10.0), 0.0);
    }

    #[test]
    fn test_compute_percentage_nonfinite_high() {
        // high が非有限なら low + 1 に置き換え → value == low で 0
        assert_eq!(compute_percentage(5.0, 5.0, f32::NAN), 0.0);
        assert_eq!(compute_percentage(5.0, 5.0, f32::INFINITY), 0.0);
        // 置き換え後も線形
        assert_eq!(compute_percentage(5.5, 5.0, f32::NAN), 0.5);
    }

    #[test]
    fn test_inside_bounds_yields_unit_interval() {
        let layout = full_layout();
        // ベロシティゾーン内を格子状に走査
        for xi in 0..=10 {
            for yi in 0..=10 {
                let x = 320.0 + 32.0 * xi as f32;
                let y = 48.0 * yi as f32;
                let pos = normalize_positions((x, y), (0.0, 0.0), &layout);
                assert!(pos.right.horizontal >= 0.0 && pos.right.horizontal <= 1.0);
                assert!(pos.right.vertical >= 0.0 && pos.right.vertical <= 1.0);
            }
        }
    }

    #[test]
    fn test_outside_zone_reads_zero() {
        let layout = full_layout();
        // 左手首（ユーザー右手）がピッチゾーン側にいる → ベロシティ読み取りは0
        let pos = normalize_positions((100.0, 240.0), (500.0, 240.0), &layout);
        assert_eq!(pos.right.horizontal, 0.0);
        assert_eq!(pos.right.vertical, 0.0);
        // 右手首（ユーザー左手）も自ゾーン外 → 0
        assert_eq!(pos.left.horizontal, 0.0);
        assert_eq!(pos.left.vertical, 0.0);
    }

    #[test]
    fn test_outside_frame_reads_zero() {
        let layout = full_layout();
        let pos = normalize_positions((650.0, 240.0), (100.0, -5.0), &layout);
        assert_eq!(pos.right.horizontal, 0.0);
        assert_eq!(pos.left.vertical, 0.0);
    }

    // シナリオ1: 右手がベロシティゾーン左端、左手がサブレンジ下端 → 両セレクタ0
    #[test]
    fn test_scenario_inner_edge_and_bottom_edge() {
        let layout = full_layout();
        let pos = normalize_positions((320.0, 240.0), (160.0, 480.0), &layout);
        assert_eq!(pos.velocity_selector(), 0.0);
        assert_eq!(pos.pitch_selector(), 0.0);
    }

    // シナリオ2: 左手がサブレンジ上端 → ピッチセレクタ1.0
    #[test]
    fn test_scenario_top_edge_max_pitch() {
        let layout = full_layout();
        let pos = normalize_positions((400.0, 240.0), (160.0, 0.0), &layout);
        assert!(approx_eq(pos.pitch_selector(), 1.0));
    }

    // シナリオ3: 右手がベロシティゾーン外側端 → ベロシティセレクタ1.0
    #[test]
    fn test_scenario_outer_edge_max_velocity() {
        let layout = full_layout();
        let pos = normalize_positions((640.0, 240.0), (160.0, 240.0), &layout);
        assert!(approx_eq(pos.velocity_selector(), 1.0));
    }

    #[test]
    fn test_subrange_vertical_mapping() {
        // サブレンジ 120..360 px
        let layout = ZoneLayout::new(640.0, 480.0, 0.5, 0.25);
        // サブレンジ中央
        let pos = normalize_positions((400.0, 240.0), (160.0, 240.0), &layout);
        assert!(approx_eq(pos.pitch_selector(), 0.5));
        // サブレンジ上端より上 → 1.0で頭打ち
        let pos = normalize_positions((400.0, 240.0), (160.0, 60.0), &layout);
        assert!(approx_eq(pos.pitch_selector(), 1.0));
        // サブレンジ下端より下 → 負値（ミュート判定用）
        let pos = normalize_positions((400.0, 240.0), (160.0, 420.0), &layout);
        assert!(pos.pitch_selector() < 0.0);
    }

    #[test]
    fn test_cross_mapping() {
        let layout = full_layout();
        // 解剖学上の左手首はユーザーの右手として right に入る
        let pos = normalize_positions((480.0, 240.0), (160.0, 120.0), &layout);
        assert!(approx_eq(pos.right.horizontal, 0.5));
        assert!(approx_eq(pos.left.vertical, 0.75));
    }
}
