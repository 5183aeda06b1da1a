use anyhow::Result;

use kinetone::audio::{ConsoleSink, NoteSink};
use kinetone::config::Config;
use kinetone::music::NoteRange;
use kinetone::session::RuntimeConfig;

const CONFIG_PATH: &str = "kinetone.toml";

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);

    println!("kinetone {}", env!("GIT_VERSION"));
    println!("Mode: {}", config.app.mode);
    println!("Model: {}", config.model.architecture);
    println!("Chord: {}", config.music.chord);
    println!(
        "Range: scale={}, offset={}",
        config.range.scale, config.range.offset
    );
    println!();

    let sink = open_sink(&config);
    run(config, sink)
}

/// MIDIポートが開ければMIDIへ、なければコンソール出力へ
fn open_sink(config: &Config) -> Box<dyn NoteSink> {
    let range = NoteRange::new(config.music.note_min, config.music.note_max);

    #[cfg(feature = "midi")]
    {
        match kinetone::audio::MidirSink::open(
            &config.music.midi_port,
            config.music.channel,
            config.music.instrument,
            range,
        ) {
            Ok(sink) => {
                println!("MIDI port: {}", sink.port_name());
                return Box::new(sink);
            }
            Err(e) => {
                eprintln!("MIDI unavailable: {}; falling back to console output", e);
            }
        }
    }

    Box::new(ConsoleSink::new(range))
}

/// シミュレーションモード: スクリプト掃引を一定時間演奏して終了
#[cfg(not(feature = "desktop"))]
fn run(config: Config, sink: Box<dyn NoteSink>) -> Result<()> {
    use kinetone::session::FrameLoop;
    use kinetone::sim::SimulatedEstimator;
    use std::time::{Duration, Instant};

    const DEMO_SECS: u64 = 20;

    let fps = config.app.target_fps.max(1);
    let runtime = RuntimeConfig::from_config(&config);

    // 約4秒で掃引1周
    let estimator = SimulatedEstimator::new(std::f32::consts::TAU / (fps as f32 * 4.0));
    let mut frame_loop = FrameLoop::new(
        estimator,
        sink,
        runtime,
        config.camera.width,
        config.camera.height,
    );
    frame_loop.start()?;
    println!("Simulation mode: playing a scripted sweep for {}s", DEMO_SECS);
    println!();

    let frame_duration = Duration::from_secs_f64(1.0 / fps as f64);
    let deadline = Instant::now() + Duration::from_secs(DEMO_SECS);
    let mut ticks = 0u64;
    let mut notes = 0u64;

    while Instant::now() < deadline {
        let tick_start = Instant::now();
        let report = frame_loop.tick(&())?;
        notes += report.events.iter().filter(|e| !e.is_mute()).count() as u64;
        ticks += 1;

        if let Some(rest) = frame_duration.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    frame_loop.stop();
    println!();
    println!("Done: {} ticks, {} note events", ticks, notes);
    Ok(())
}

/// デスクトップモード: カメラ + MoveNet + オーバーレイウィンドウ
#[cfg(feature = "desktop")]
fn run(config: Config, sink: Box<dyn NoteSink>) -> Result<()> {
    use kinetone::camera::ThreadedCamera;
    use kinetone::music::chord_names;
    use kinetone::pose::{ModelArch, MoveNetDetector};
    use kinetone::render::{Key, MinifbRenderer};
    use kinetone::session::{DetectionMode, FrameLoop};
    use std::time::{Duration, Instant};

    // カメラ取得失敗はセッション開始不能。リトライしない
    let camera = match ThreadedCamera::start(&config.camera) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Camera acquisition failed: {}", e);
            eprintln!("The session cannot start without a camera.");
            return Err(e);
        }
    };
    let (width, height) = camera.resolution();
    println!("Camera: {}x{}", width, height);

    let runtime = RuntimeConfig::from_config(&config);
    let detector = MoveNetDetector::new(runtime.arch);
    let mut renderer = MinifbRenderer::new("kinetone", width as usize, height as usize)?;

    let mut frame_loop = FrameLoop::new(detector, sink, runtime, width, height);
    frame_loop.start()?;
    println!("Model loaded: {}", frame_loop.config().arch.name());
    println!();
    println!("Keys: [1-4] model  [C] chord  [M] mode  [V/P/S/Z/R/W/B] overlays  [Esc] quit");
    println!();

    let frame_duration = Duration::from_secs_f64(1.0 / config.app.target_fps.max(1) as f64);
    let chords = chord_names();
    let mut chord_idx = chords
        .iter()
        .position(|&n| n == config.music.chord.as_str())
        .unwrap_or(0);

    let mut last_frame_id = 0u64;
    let mut frame_count = 0u32;
    let mut fps_timer = Instant::now();

    while renderer.is_open() && frame_loop.is_running() {
        let loop_start = Instant::now();

        // キー入力
        if renderer.is_key_pressed(Key::Key1) {
            frame_loop.set_architecture(ModelArch::Lightning);
            println!("Model: lightning");
        }
        if renderer.is_key_pressed(Key::Key2) {
            frame_loop.set_architecture(ModelArch::LightningF16);
            println!("Model: lightning_f16");
        }
        if renderer.is_key_pressed(Key::Key3) {
            frame_loop.set_architecture(ModelArch::Thunder);
            println!("Model: thunder");
        }
        if renderer.is_key_pressed(Key::Key4) {
            frame_loop.set_architecture(ModelArch::ThunderF16);
            println!("Model: thunder_f16");
        }
        if renderer.is_key_pressed(Key::C) {
            chord_idx = (chord_idx + 1) % chords.len();
            frame_loop.set_chord(chords[chord_idx]);
            println!("Chord: {}", chords[chord_idx]);
        }
        if renderer.is_key_pressed(Key::M) {
            let mode = match frame_loop.config().mode {
                DetectionMode::Single => DetectionMode::Multi,
                DetectionMode::Multi => DetectionMode::Single,
            };
            frame_loop.set_mode(mode);
            println!("Mode: {}", mode.name());
        }
        if renderer.is_key_pressed(Key::V) {
            frame_loop.overlay_mut().video = !frame_loop.config().overlay.video;
        }
        if renderer.is_key_pressed(Key::P) {
            frame_loop.overlay_mut().points = !frame_loop.config().overlay.points;
        }
        if renderer.is_key_pressed(Key::S) {
            frame_loop.overlay_mut().skeleton = !frame_loop.config().overlay.skeleton;
        }
        if renderer.is_key_pressed(Key::Z) {
            frame_loop.overlay_mut().zones = !frame_loop.config().overlay.zones;
        }
        if renderer.is_key_pressed(Key::R) {
            frame_loop.overlay_mut().scale_marker = !frame_loop.config().overlay.scale_marker;
        }
        if renderer.is_key_pressed(Key::W) {
            frame_loop.overlay_mut().waveform = !frame_loop.config().overlay.waveform;
        }
        if renderer.is_key_pressed(Key::B) {
            frame_loop.overlay_mut().bounding_box = !frame_loop.config().overlay.bounding_box;
        }

        // 新フレームが来ていなければ待つ
        let current_frame_id = camera.frame_id();
        if current_frame_id == last_frame_id {
            std::thread::sleep(Duration::from_millis(1));
            renderer.update()?;
            continue;
        }
        let frame = match camera.get_frame() {
            Some(f) => f,
            None => {
                std::thread::sleep(Duration::from_millis(1));
                continue;
            }
        };
        last_frame_id = current_frame_id;

        let report = frame_loop.tick(&frame)?;

        // 描画
        renderer.clear();
        let toggles = frame_loop.config().overlay;
        if toggles.video {
            renderer.draw_frame_mirrored(&frame)?;
        }
        if toggles.zones {
            renderer.draw_zones(frame_loop.zones());
        }
        if toggles.scale_marker {
            renderer.draw_scale_marker(frame_loop.zones());
        }
        let min_part = frame_loop.config().min_part_confidence;
        for pose in &report.poses {
            if toggles.points || toggles.skeleton {
                renderer.draw_pose(pose, min_part, toggles.points, toggles.skeleton);
            }
            if toggles.bounding_box {
                if let Some(bbox) = pose.bounding_box(min_part) {
                    renderer.draw_bounding_box(&bbox);
                }
            }
        }
        if toggles.waveform {
            renderer.draw_waveform(&report.waveform);
        }
        renderer.update()?;

        // FPS表示（1秒に1回）
        frame_count += 1;
        let elapsed = fps_timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            println!(
                "FPS: {:.1}, poses: {}",
                frame_count as f32 / elapsed,
                report.poses.len()
            );
            frame_count = 0;
            fps_timer = Instant::now();
        }

        if let Some(rest) = frame_duration.checked_sub(loop_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    frame_loop.stop();
    println!("Shutting down...");
    Ok(())
}
