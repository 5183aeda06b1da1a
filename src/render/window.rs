use anyhow::Result;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use opencv::core::Mat;
use opencv::prelude::*;

use crate::pose::{BBox, Pose};
use crate::render::skeleton::{
    BBOX_COLOR, KEYPOINT_COLOR, LOW_CONFIDENCE_COLOR, SCALE_MARKER_COLOR, SKELETON_COLOR,
    SKELETON_CONNECTIONS, WAVEFORM_COLOR, ZONE_COLOR,
};
use crate::zone::ZoneLayout;

/// minifbを使用したオーバーレイレンダラー
///
/// 毎フレーム `clear` → 各 draw → `update` の順で呼ぶ。
/// 各drawは表示トグルに応じて呼び出し側が選択する。
pub struct MinifbRenderer {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl MinifbRenderer {
    /// ウィンドウを作成
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        let buffer = vec![0u32; width * height];

        Ok(Self {
            window,
            buffer,
            width,
            height,
        })
    }

    /// ウィンドウが開いているか
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// バッファを黒で塗りつぶす
    pub fn clear(&mut self) {
        self.buffer.fill(0);
    }

    /// BGR Mat を左右反転（ミラー）してバッファにコピー
    pub fn draw_frame_mirrored(&mut self, frame: &Mat) -> Result<()> {
        let frame_width = frame.cols() as usize;
        let frame_height = frame.rows() as usize;

        for y in 0..self.height.min(frame_height) {
            for x in 0..self.width.min(frame_width) {
                let src_x = (frame_width - 1 - x) as i32;
                let pixel = frame.at_2d::<opencv::core::Vec3b>(y as i32, src_x)?;
                // BGR -> RGB -> u32
                let r = pixel[2] as u32;
                let g = pixel[1] as u32;
                let b = pixel[0] as u32;
                self.buffer[y * self.width + x] = (r << 16) | (g << 8) | b;
            }
        }

        Ok(())
    }

    /// 姿勢を描画
    pub fn draw_pose(&mut self, pose: &Pose, confidence_threshold: f32, points: bool, skeleton: bool) {
        let w = self.width as u32;
        let h = self.height as u32;

        if skeleton {
            for (start_idx, end_idx) in SKELETON_CONNECTIONS.iter() {
                let start = pose.get(*start_idx);
                let end = pose.get(*end_idx);

                if start.is_valid(confidence_threshold) && end.is_valid(confidence_threshold) {
                    let (x1, y1) = start.to_pixel(w, h);
                    let (x2, y2) = end.to_pixel(w, h);
                    self.draw_line(x1, y1, x2, y2, SKELETON_COLOR);
                }
            }
        }

        if points {
            for kp in pose.keypoints.iter() {
                let (px, py) = kp.to_pixel(w, h);
                let color = if kp.is_valid(confidence_threshold) {
                    KEYPOINT_COLOR
                } else {
                    LOW_CONFIDENCE_COLOR
                };
                self.draw_circle(px, py, 4, color);
            }
        }
    }

    /// ゾーン枠線を描画
    pub fn draw_zones(&mut self, layout: &ZoneLayout) {
        for zone in [&layout.pitch, &layout.velocity] {
            self.draw_rect(
                zone.left as i32,
                zone.top as i32,
                zone.right as i32,
                zone.bottom as i32,
                ZONE_COLOR,
            );
        }
    }

    /// ピッチレンジの目盛りを描画
    ///
    /// ピッチゾーン左端にサブレンジの上端・下端と中間目盛りを引く。
    pub fn draw_scale_marker(&mut self, layout: &ZoneLayout) {
        const TICKS: i32 = 8;
        const LONG_TICK: i32 = 14;
        const SHORT_TICK: i32 = 7;

        let x0 = layout.pitch.left as i32;
        let top = layout.range_top;
        let bottom = layout.range_bottom;

        for i in 0..=TICKS {
            let y = (top + (bottom - top) * i as f32 / TICKS as f32) as i32;
            let len = if i == 0 || i == TICKS { LONG_TICK } else { SHORT_TICK };
            self.draw_line(x0, y, x0 + len, y, SCALE_MARKER_COLOR);
        }
        // サブレンジの縦ガイド
        self.draw_line(x0, top as i32, x0, bottom as i32, SCALE_MARKER_COLOR);
    }

    /// バウンディングボックスを描画（正規化座標入力）
    pub fn draw_bounding_box(&mut self, bbox: &BBox) {
        let w = self.width as f32;
        let h = self.height as f32;
        self.draw_rect(
            (bbox.min_x * w) as i32,
            (bbox.min_y * h) as i32,
            (bbox.max_x * w) as i32,
            (bbox.max_y * h) as i32,
            BBOX_COLOR,
        );
    }

    /// 波形をウィンドウ下部に描画
    pub fn draw_waveform(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let band = (self.height / 6).max(16);
        let mid = self.height as i32 - band as i32 / 2;
        let half = band as f32 / 2.0;

        let mut prev: Option<(i32, i32)> = None;
        for (i, &s) in samples.iter().enumerate() {
            let x = (i * self.width / samples.len()) as i32;
            let y = mid - (s.clamp(-1.0, 1.0) * half) as i32;
            if let Some((px, py)) = prev {
                self.draw_line(px, py, x, y, WAVEFORM_COLOR);
            }
            prev = Some((x, y));
        }
    }

    /// バッファをウィンドウに表示
    pub fn update(&mut self) -> Result<()> {
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)?;
        Ok(())
    }

    /// 矩形の枠線を描画
    fn draw_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        self.draw_line(x0, y0, x1, y0, color);
        self.draw_line(x1, y0, x1, y1, color);
        self.draw_line(x1, y1, x0, y1, color);
        self.draw_line(x0, y1, x0, y0, color);
    }

    /// Bresenhamのアルゴリズムで線を描画
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// 円を描画（塗りつぶし）
    fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// ピクセルをセット（境界チェック付き）
    fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize * self.width + x as usize] = color;
        }
    }
}
