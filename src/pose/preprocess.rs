use anyhow::Result;
use ndarray::Array4;
use opencv::{
    core::{AlgorithmHint, Mat, Size, CV_32FC3},
    imgproc,
    prelude::*,
};

/// スケール係数とストライドから実効入力解像度を決める
///
/// 基準解像度 `base` に `scale_factor` を掛けた上で、
/// `(n - 1)` がストライドの倍数になるよう切り下げる（MoveNet/PoseNet系の慣習）。
/// 最低でも 1 ストライド分 + 1 ピクセルは確保する。
pub fn effective_input_size(base: u32, scale_factor: f32, stride: u32) -> u32 {
    let stride = stride.max(1);
    let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor.min(1.0)
    } else {
        1.0
    };
    let scaled = (base as f32 * scale) as u32;
    let snapped = (scaled.saturating_sub(1) / stride) * stride + 1;
    snapped.max(stride + 1)
}

/// OpenCV Mat を MoveNet用の入力テンソルに変換
///
/// - BGR -> RGB
/// - `input_size` x `input_size` にリサイズ
/// - [1, n, n, 3] の f32 テンソルに変換 (0.0-255.0)
pub fn preprocess_frame(frame: &Mat, input_size: u32) -> Result<Array4<f32>> {
    let side = input_size as i32;

    // BGR -> RGB
    let mut rgb = Mat::default();
    imgproc::cvt_color(
        frame,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;

    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(side, side),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    // f32 に変換
    let mut float_mat = Mat::default();
    resized.convert_to(&mut float_mat, CV_32FC3, 1.0, 0.0)?;

    // ndarray に変換 [1, n, n, 3]
    let mut tensor = Array4::<f32>::zeros((1, side as usize, side as usize, 3));

    for y in 0..side {
        for x in 0..side {
            let pixel = float_mat.at_2d::<opencv::core::Vec3f>(y, x)?;
            tensor[[0, y as usize, x as usize, 0]] = pixel[0];
            tensor[[0, y as usize, x as usize, 1]] = pixel[1];
            tensor[[0, y as usize, x as usize, 2]] = pixel[2];
        }
    }

    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_input_size_full_scale() {
        // (192 - 1) / 16 * 16 + 1 = 177
        assert_eq!(effective_input_size(192, 1.0, 16), 177);
    }

    #[test]
    fn test_effective_input_size_half_scale() {
        // 192 * 0.5 = 96 -> (95 / 16) * 16 + 1 = 81
        assert_eq!(effective_input_size(192, 0.5, 16), 81);
    }

    #[test]
    fn test_effective_input_size_guards() {
        // 非数・ゼロのスケールはフルスケール扱い
        assert_eq!(
            effective_input_size(192, f32::NAN, 16),
            effective_input_size(192, 1.0, 16)
        );
        assert_eq!(
            effective_input_size(192, 0.0, 16),
            effective_input_size(192, 1.0, 16)
        );
        // 極端な縮小でも最低解像度を下回らない
        assert_eq!(effective_input_size(192, 0.01, 16), 17);
    }
}
