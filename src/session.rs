use anyhow::Result;

use crate::audio::NoteSink;
use crate::config::Config;
use crate::mapping::{normalize_positions, NormalizedPosition};
use crate::music::{chord_for, ChordIntervals, NoteEvent, NoteRange};
use crate::pose::{InferenceOptions, KeypointIndex, ModelArch, Pose, PoseEstimator};
use crate::smooth::Smoother;
use crate::zone::ZoneLayout;

/// フレームループの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    LoadingModel,
    Ready,
    ReloadingModel,
}

/// 検出モード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    Single,
    Multi,
}

impl DetectionMode {
    /// 設定文字列から変換。未知の値は Single へフォールバック
    pub fn from_name(name: &str) -> Self {
        match name {
            "multi" => DetectionMode::Multi,
            _ => DetectionMode::Single,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DetectionMode::Single => "single",
            DetectionMode::Multi => "multi",
        }
    }
}

/// オーバーレイ表示トグル
#[derive(Debug, Clone, Copy)]
pub struct OverlayToggles {
    pub video: bool,
    pub points: bool,
    pub skeleton: bool,
    pub zones: bool,
    pub scale_marker: bool,
    pub waveform: bool,
    pub bounding_box: bool,
}

/// フレームループへ構築時に渡す実行設定
///
/// グローバル状態は持たず、変更はループのセッター経由でのみ行う。
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub mode: DetectionMode,
    pub min_pose_confidence: f32,
    pub min_part_confidence: f32,
    pub arch: ModelArch,
    pub output_stride: u32,
    pub image_scale_factor: f32,
    pub chord: ChordIntervals,
    pub note_duration_ms: u64,
    pub note_range: NoteRange,
    pub range_scale: f32,
    pub range_offset: f32,
    pub smooth_alpha: f32,
    pub overlay: OverlayToggles,
}

impl RuntimeConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: DetectionMode::from_name(&config.app.mode),
            min_pose_confidence: config.confidence.min_pose,
            min_part_confidence: config.confidence.min_part,
            arch: ModelArch::from_name(&config.model.architecture),
            output_stride: config.model.output_stride,
            image_scale_factor: config.model.image_scale_factor,
            chord: chord_for(&config.music.chord),
            note_duration_ms: config.music.note_duration_ms,
            note_range: NoteRange::new(config.music.note_min, config.music.note_max),
            range_scale: config.range.scale,
            range_offset: config.range.offset,
            smooth_alpha: config.music.smooth_alpha,
            overlay: OverlayToggles {
                video: config.overlay.video,
                points: config.overlay.points,
                skeleton: config.overlay.skeleton,
                zones: config.overlay.zones,
                scale_marker: config.overlay.scale_marker,
                waveform: config.overlay.waveform,
                bounding_box: config.overlay.bounding_box,
            },
        }
    }
}

/// 1ティック分の結果。描画はこれを読んで呼び出し側が行う
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub poses: Vec<Pose>,
    /// ゾーンマッパーの生の読み取り値（平滑化前）
    pub readings: Vec<NormalizedPosition>,
    pub events: Vec<NoteEvent>,
    pub waveform: Vec<f32>,
    /// リロードや停止でフレームを破棄した場合 true
    pub skipped: bool,
}

/// フレームループ本体
///
/// 単一タイムライン上で動く状態機械。1ティックが1フレーム分の
/// 有界な処理単位で、並行実行はない。モデル切り替えはワンショットの
/// 保留フラグとして積み、次のティック冒頭で処理する（その間の
/// フレームは破棄され、NoteEventは出ない）。
pub struct FrameLoop<E: PoseEstimator, S: NoteSink> {
    estimator: E,
    sink: S,
    config: RuntimeConfig,
    zones: ZoneLayout,
    smoother: Smoother,
    state: LoopState,
    pending_arch: Option<ModelArch>,
    running: bool,
    frame_width: f32,
    frame_height: f32,
}

impl<E: PoseEstimator, S: NoteSink> FrameLoop<E, S> {
    pub fn new(
        estimator: E,
        sink: S,
        config: RuntimeConfig,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let frame_width = frame_width as f32;
        let frame_height = frame_height as f32;
        let zones = ZoneLayout::new(
            frame_width,
            frame_height,
            config.range_scale,
            config.range_offset,
        );
        let smoother = Smoother::new(config.smooth_alpha);
        Self {
            estimator,
            sink,
            config,
            zones,
            smoother,
            state: LoopState::Idle,
            pending_arch: None,
            running: false,
            frame_width,
            frame_height,
        }
    }

    /// モデルをロードしてループを開始する
    pub fn start(&mut self) -> Result<()> {
        self.state = LoopState::LoadingModel;
        self.estimator.reload(self.config.arch)?;
        self.state = LoopState::Ready;
        self.running = true;
        Ok(())
    }

    /// キャンセルフラグを立てる。次のティック以降フレームは破棄される
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn zones(&self) -> &ZoneLayout {
        &self.zones
    }

    /// モデル切り替えを予約する（ワンショット）
    ///
    /// 実際の解放と再初期化は次のティック冒頭で行う。
    pub fn set_architecture(&mut self, arch: ModelArch) {
        if arch != self.config.arch {
            self.pending_arch = Some(arch);
        }
    }

    pub fn set_mode(&mut self, mode: DetectionMode) {
        self.config.mode = mode;
    }

    pub fn set_confidence(&mut self, min_pose: f32, min_part: f32) {
        self.config.min_pose_confidence = min_pose;
        self.config.min_part_confidence = min_part;
    }

    pub fn set_chord(&mut self, name: &str) {
        self.config.chord = chord_for(name);
    }

    pub fn set_note_duration(&mut self, duration_ms: u64) {
        self.config.note_duration_ms = duration_ms;
    }

    /// 縦方向サブレンジを変更しゾーンを再計算する
    pub fn set_range(&mut self, scale: f32, offset: f32) {
        self.config.range_scale = scale;
        self.config.range_offset = offset;
        self.rebuild_zones();
    }

    /// フレーム寸法の変更。ゾーンを再計算する
    pub fn set_frame_size(&mut self, width: u32, height: u32) {
        self.frame_width = width as f32;
        self.frame_height = height as f32;
        self.rebuild_zones();
    }

    pub fn overlay_mut(&mut self) -> &mut OverlayToggles {
        &mut self.config.overlay
    }

    fn rebuild_zones(&mut self) {
        self.zones = ZoneLayout::new(
            self.frame_width,
            self.frame_height,
            self.config.range_scale,
            self.config.range_offset,
        );
    }

    fn mute_event(&self) -> NoteEvent {
        NoteEvent::mute(self.config.note_duration_ms, self.config.chord)
    }

    /// 1フレーム分の処理
    ///
    /// 保留中のモデル切り替えがあれば先に処理し、そのフレームは破棄する。
    /// リロード失敗はセッション致命エラーとして伝播する。
    pub fn tick(&mut self, frame: &E::Frame) -> Result<TickReport> {
        if !self.running {
            return Ok(TickReport {
                skipped: true,
                ..TickReport::default()
            });
        }

        if let Some(arch) = self.pending_arch.take() {
            return self.reload_model(arch);
        }

        if self.state != LoopState::Ready {
            return Ok(TickReport {
                skipped: true,
                ..TickReport::default()
            });
        }

        let opts = InferenceOptions {
            image_scale_factor: self.config.image_scale_factor,
            flip_horizontal: true,
            output_stride: self.config.output_stride,
        };

        let poses = match self.config.mode {
            DetectionMode::Single => self.estimator.estimate_single(frame, &opts)?,
            DetectionMode::Multi => self.estimator.estimate_multiple(frame, &opts)?,
        };

        let mut report = TickReport::default();

        // EMA履歴は単一被写体の連続フレームに対してのみ意味を持つ。
        // 複数被写体が通るティックでは平滑化を迂回し、履歴を捨てる。
        let qualifying = poses
            .iter()
            .filter(|p| p.score >= self.config.min_pose_confidence)
            .count();
        if qualifying > 1 {
            self.smoother.reset();
        }

        for pose in &poses {
            if pose.score < self.config.min_pose_confidence {
                continue;
            }

            let (left_wrist, right_wrist) = pose.wrists();
            let event = if left_wrist.is_valid(self.config.min_part_confidence)
                && right_wrist.is_valid(self.config.min_part_confidence)
            {
                let lw = left_wrist.to_pixel_f32(self.frame_width, self.frame_height);
                let rw = right_wrist.to_pixel_f32(self.frame_width, self.frame_height);
                let reading = normalize_positions(lw, rw, &self.zones);
                // readings には常にマッパーの生の出力を積む
                report.readings.push(reading);

                if reading.pitch_selector() > 0.0 && reading.velocity_selector() > 0.0 {
                    let smoothed = if qualifying > 1 {
                        reading
                    } else {
                        self.smoother.apply(reading)
                    };
                    NoteEvent::new(
                        smoothed.pitch_selector(),
                        smoothed.velocity_selector(),
                        self.config.note_duration_ms,
                        self.config.chord,
                    )
                } else {
                    self.smoother.reset();
                    self.mute_event()
                }
            } else {
                self.smoother.reset();
                self.mute_event()
            };

            self.sink.play(&event)?;
            report.events.push(event);
        }

        // 有効なポーズが1つもなければミュートを1回送って消音する
        if report.events.is_empty() {
            self.smoother.reset();
            let event = self.mute_event();
            self.sink.play(&event)?;
            report.events.push(event);
        }

        if self.config.overlay.waveform {
            report.waveform = self.sink.waveform();
        }
        report.poses = poses;
        Ok(report)
    }

    fn reload_model(&mut self, arch: ModelArch) -> Result<TickReport> {
        self.state = LoopState::ReloadingModel;
        self.smoother.reset();
        // 推定器側が旧セッションを解放してから新セッションを構築する
        self.estimator.reload(arch)?;
        self.config.arch = arch;
        self.state = LoopState::Ready;
        Ok(TickReport {
            skipped: true,
            ..TickReport::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Keypoint;

    /// テスト用の固定ポーズ推定器
    struct FakeEstimator {
        poses: Vec<Pose>,
        reloads: Vec<ModelArch>,
        fail_reload: bool,
        single_calls: u32,
        multi_calls: u32,
    }

    impl FakeEstimator {
        fn with_poses(poses: Vec<Pose>) -> Self {
            Self {
                poses,
                reloads: Vec::new(),
                fail_reload: false,
                single_calls: 0,
                multi_calls: 0,
            }
        }
    }

    impl PoseEstimator for FakeEstimator {
        type Frame = ();

        fn estimate_single(&mut self, _: &(), _: &InferenceOptions) -> Result<Vec<Pose>> {
            self.single_calls += 1;
            Ok(self.poses.clone())
        }

        fn estimate_multiple(&mut self, _: &(), _: &InferenceOptions) -> Result<Vec<Pose>> {
            self.multi_calls += 1;
            Ok(self.poses.clone())
        }

        fn reload(&mut self, arch: ModelArch) -> Result<()> {
            if self.fail_reload {
                anyhow::bail!("model fetch failed");
            }
            self.reloads.push(arch);
            Ok(())
        }
    }

    /// 再生されたイベントを記録するシンク
    struct RecordingSink {
        events: Vec<NoteEvent>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { events: Vec::new() }
        }
    }

    impl NoteSink for RecordingSink {
        fn play(&mut self, event: &NoteEvent) -> Result<()> {
            self.events.push(*event);
            Ok(())
        }
        fn waveform(&self) -> Vec<f32> {
            vec![0.25; 4]
        }
        fn name(&self) -> &'static str {
            "recording"
        }
    }

    /// 両手首だけ信頼度を持つポーズを作る（座標は正規化値）
    fn pose_with_wrists(lw: (f32, f32, f32), rw: (f32, f32, f32), score: f32) -> Pose {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        keypoints[KeypointIndex::LeftWrist as usize] = Keypoint::new(lw.0, lw.1, lw.2);
        keypoints[KeypointIndex::RightWrist as usize] = Keypoint::new(rw.0, rw.1, rw.2);
        Pose::with_score(keypoints, score)
    }

    fn test_config() -> RuntimeConfig {
        let mut config = RuntimeConfig::from_config(&Config::default());
        // テストはフルレンジのサブレンジで行う
        config.range_scale = 1.0;
        config.range_offset = 0.0;
        config
    }

    fn make_loop(
        poses: Vec<Pose>,
    ) -> FrameLoop<FakeEstimator, RecordingSink> {
        let mut frame_loop = FrameLoop::new(
            FakeEstimator::with_poses(poses),
            RecordingSink::new(),
            test_config(),
            640,
            480,
        );
        frame_loop.start().unwrap();
        frame_loop
    }

    #[test]
    fn test_start_transitions_to_ready() {
        let mut frame_loop = make_loop(vec![]);
        assert_eq!(frame_loop.state(), LoopState::Ready);
        assert!(frame_loop.is_running());
        // 起動時に設定のプリセットがロードされている
        assert_eq!(frame_loop.estimator.reloads, vec![ModelArch::Lightning]);
        frame_loop.stop();
        assert!(!frame_loop.is_running());
    }

    #[test]
    fn test_tick_before_start_is_skipped() {
        let mut frame_loop = FrameLoop::new(
            FakeEstimator::with_poses(vec![]),
            RecordingSink::new(),
            test_config(),
            640,
            480,
        );
        let report = frame_loop.tick(&()).unwrap();
        assert!(report.skipped);
        assert!(report.events.is_empty());
    }

    // シナリオ1: 両手首がそれぞれの下端・内側端 → セレクタ(0, 0) → ミュート
    #[test]
    fn test_scenario_edges_produce_mute() {
        // 左手首(ユーザー右手)はベロシティゾーン左端 x=0.5、
        // 右手首(ユーザー左手)はピッチゾーン下端 y=1.0
        let pose = pose_with_wrists((0.5, 0.5, 0.9), (0.25, 1.0, 0.9), 0.9);
        let mut frame_loop = make_loop(vec![pose]);
        let report = frame_loop.tick(&()).unwrap();
        assert_eq!(report.events.len(), 1);
        assert!(report.events[0].is_mute());
    }

    // シナリオ2: 左手がサブレンジ上端 → ピッチセレクタ1.0
    #[test]
    fn test_scenario_top_edge_max_pitch() {
        let pose = pose_with_wrists((0.75, 0.5, 0.9), (0.25, 0.0, 0.9), 0.9);
        let mut frame_loop = make_loop(vec![pose]);
        let report = frame_loop.tick(&()).unwrap();
        assert_eq!(report.events.len(), 1);
        assert!(!report.events[0].is_mute());
        assert!((report.events[0].pitch_selector - 1.0).abs() < 1e-6);
    }

    // シナリオ3: 右手がベロシティゾーン外側端 → ベロシティセレクタ1.0
    #[test]
    fn test_scenario_outer_edge_max_velocity() {
        let pose = pose_with_wrists((1.0, 0.5, 0.9), (0.25, 0.5, 0.9), 0.9);
        let mut frame_loop = make_loop(vec![pose]);
        let report = frame_loop.tick(&()).unwrap();
        assert!((report.events[0].velocity_selector - 1.0).abs() < 1e-6);
    }

    // シナリオ4: 手首の信頼度不足 → 位置に関わらずミュート
    #[test]
    fn test_scenario_low_part_confidence_mutes() {
        let pose = pose_with_wrists((0.75, 0.3, 0.05), (0.25, 0.3, 0.9), 0.9);
        let mut frame_loop = make_loop(vec![pose]);
        let report = frame_loop.tick(&()).unwrap();
        assert_eq!(report.events.len(), 1);
        assert!(report.events[0].is_mute());
    }

    // ポーズ全体のスコア不足 → ミュート以外のイベントは出ない
    #[test]
    fn test_low_pose_confidence_mutes() {
        let pose = pose_with_wrists((0.75, 0.3, 0.9), (0.25, 0.3, 0.9), 0.05);
        let mut frame_loop = make_loop(vec![pose]);
        let report = frame_loop.tick(&()).unwrap();
        assert_eq!(report.events.len(), 1);
        assert!(report.events[0].is_mute());
    }

    // ポーズなし → ミュート1回
    #[test]
    fn test_no_poses_dispatches_single_mute() {
        let mut frame_loop = make_loop(vec![]);
        let report = frame_loop.tick(&()).unwrap();
        assert_eq!(report.events.len(), 1);
        assert!(report.events[0].is_mute());
        assert_eq!(frame_loop.sink.events.len(), 1);
    }

    // シナリオ5: モデル切り替え → 旧モデル解放・フレーム破棄・イベントなし
    #[test]
    fn test_scenario_arch_switch_skips_frame() {
        let pose = pose_with_wrists((0.75, 0.3, 0.9), (0.25, 0.3, 0.9), 0.9);
        let mut frame_loop = make_loop(vec![pose]);

        frame_loop.set_architecture(ModelArch::Thunder);
        let report = frame_loop.tick(&()).unwrap();
        assert!(report.skipped);
        assert!(report.events.is_empty());
        assert!(frame_loop.sink.events.is_empty());
        assert_eq!(
            frame_loop.estimator.reloads,
            vec![ModelArch::Lightning, ModelArch::Thunder]
        );
        assert_eq!(frame_loop.state(), LoopState::Ready);
        assert_eq!(frame_loop.config().arch, ModelArch::Thunder);

        // 次のティックからは通常処理
        let report = frame_loop.tick(&()).unwrap();
        assert!(!report.skipped);
        assert_eq!(report.events.len(), 1);
    }

    // 同じプリセットの再選択はリロードしない（ワンショットフラグ）
    #[test]
    fn test_same_arch_is_noop() {
        let mut frame_loop = make_loop(vec![]);
        frame_loop.set_architecture(ModelArch::Lightning);
        let report = frame_loop.tick(&()).unwrap();
        assert!(!report.skipped);
        assert_eq!(frame_loop.estimator.reloads.len(), 1);
    }

    // リロード失敗はセッション致命エラー
    #[test]
    fn test_reload_failure_propagates() {
        let mut frame_loop = make_loop(vec![]);
        frame_loop.estimator.fail_reload = true;
        frame_loop.set_architecture(ModelArch::Thunder);
        assert!(frame_loop.tick(&()).is_err());
        assert_eq!(frame_loop.state(), LoopState::ReloadingModel);
    }

    #[test]
    fn test_mode_selects_estimator_operation() {
        let pose = pose_with_wrists((0.75, 0.3, 0.9), (0.25, 0.3, 0.9), 0.9);
        let mut frame_loop = make_loop(vec![pose]);
        frame_loop.tick(&()).unwrap();
        assert_eq!(frame_loop.estimator.single_calls, 1);
        assert_eq!(frame_loop.estimator.multi_calls, 0);

        frame_loop.set_mode(DetectionMode::Multi);
        frame_loop.tick(&()).unwrap();
        assert_eq!(frame_loop.estimator.multi_calls, 1);
    }

    // マルチポーズ: 各ポーズがイベントを出し、最後のポーズが音声状態を決める
    #[test]
    fn test_multi_pose_dispatch_order() {
        let p1 = pose_with_wrists((0.75, 0.3, 0.9), (0.25, 0.25, 0.9), 0.9);
        let p2 = pose_with_wrists((0.9, 0.3, 0.9), (0.25, 0.75, 0.9), 0.9);
        let mut frame_loop = make_loop(vec![p1, p2]);
        frame_loop.set_mode(DetectionMode::Multi);
        let report = frame_loop.tick(&()).unwrap();
        assert_eq!(report.events.len(), 2);
        // 後勝ち: シンクが最後に受け取るのは p2 のイベント
        let last = frame_loop.sink.events.last().unwrap();
        assert!((last.pitch_selector - 0.25).abs() < 1e-6);
    }

    // 複数被写体ティックでは平滑化を迂回し、各イベントは自分のポーズの
    // 読み取り値だけから作られる
    #[test]
    fn test_multi_pose_smoothing_keeps_subjects_separate() {
        let p1 = pose_with_wrists((0.75, 0.3, 0.9), (0.25, 0.25, 0.9), 0.9);
        let p2 = pose_with_wrists((0.9, 0.3, 0.9), (0.25, 0.75, 0.9), 0.9);
        let mut config = test_config();
        config.smooth_alpha = 0.5;
        let mut frame_loop = FrameLoop::new(
            FakeEstimator::with_poses(vec![p1, p2]),
            RecordingSink::new(),
            config,
            640,
            480,
        );
        frame_loop.start().unwrap();
        frame_loop.set_mode(DetectionMode::Multi);

        let report = frame_loop.tick(&()).unwrap();
        assert_eq!(report.events.len(), 2);
        // p1: 手首y=0.25 → ピッチ0.75、p2: 手首y=0.75 → ピッチ0.25
        assert!((report.events[0].pitch_selector - 0.75).abs() < 1e-6);
        assert!((report.events[1].pitch_selector - 0.25).abs() < 1e-6);

        // 2ティック目もEMA履歴が持ち越されない
        let report = frame_loop.tick(&()).unwrap();
        assert!((report.events[0].pitch_selector - 0.75).abs() < 1e-6);
        assert!((report.events[1].pitch_selector - 0.25).abs() < 1e-6);
    }

    // readings は平滑化前のマッパー出力、イベントは平滑化後の値を使う
    #[test]
    fn test_readings_stay_raw_under_smoothing() {
        let p1 = pose_with_wrists((0.75, 0.5, 0.9), (0.25, 0.75, 0.9), 0.9);
        let mut config = test_config();
        config.smooth_alpha = 0.5;
        let mut frame_loop = FrameLoop::new(
            FakeEstimator::with_poses(vec![p1]),
            RecordingSink::new(),
            config,
            640,
            480,
        );
        frame_loop.start().unwrap();
        // 初回フレームはそのまま通る（ピッチ0.25）
        frame_loop.tick(&()).unwrap();

        // 手首が動いて生のピッチ読み取りは0.75になる
        frame_loop.estimator.poses =
            vec![pose_with_wrists((0.75, 0.5, 0.9), (0.25, 0.25, 0.9), 0.9)];
        let report = frame_loop.tick(&()).unwrap();
        assert!((report.readings[0].pitch_selector() - 0.75).abs() < 1e-6);
        // イベントはEMA後の中間値
        assert!((report.events[0].pitch_selector - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_stop_discards_frames() {
        let pose = pose_with_wrists((0.75, 0.3, 0.9), (0.25, 0.3, 0.9), 0.9);
        let mut frame_loop = make_loop(vec![pose]);
        frame_loop.stop();
        let report = frame_loop.tick(&()).unwrap();
        assert!(report.skipped);
        assert!(frame_loop.sink.events.is_empty());
    }

    #[test]
    fn test_set_range_rebuilds_zones() {
        let mut frame_loop = make_loop(vec![]);
        assert_eq!(frame_loop.zones().range_bottom, 480.0);
        frame_loop.set_range(0.5, 0.25);
        assert_eq!(frame_loop.zones().range_top, 120.0);
        assert_eq!(frame_loop.zones().range_bottom, 360.0);
    }

    #[test]
    fn test_waveform_follows_toggle() {
        let mut frame_loop = make_loop(vec![]);
        let report = frame_loop.tick(&()).unwrap();
        assert!(!report.waveform.is_empty());
        frame_loop.overlay_mut().waveform = false;
        let report = frame_loop.tick(&()).unwrap();
        assert!(report.waveform.is_empty());
    }

    #[test]
    fn test_unknown_chord_falls_back() {
        let mut frame_loop = make_loop(vec![]);
        frame_loop.set_chord("mixolydian99");
        assert_eq!(frame_loop.config().chord.name, "chromatic");
    }
}
