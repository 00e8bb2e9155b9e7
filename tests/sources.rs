use std::path::PathBuf;
use std::process::Command;

use image::{Rgb, RgbImage};
use synoid_panel::config::BufferPlan;
use synoid_panel::engine::Resolution;
use synoid_panel::sink::NullSink;
use synoid_panel::source::{self, FfmpegSource, FrameSource, ImageSequenceSource, Next, PatternSource};
use synoid_panel::{FillMode, PacingPolicy, PlaybackContext, PlaybackScheduler, PlaybackState};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("synoid_panel_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn ffmpeg_available() -> bool {
    let found = |bin: &str| {
        Command::new(bin)
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    };
    found("ffmpeg") && found("ffprobe")
}

#[test]
fn test_image_sequence_sorted_resized_and_skips_garbage() {
    let dir = scratch_dir("sequence");
    RgbImage::from_pixel(8, 6, Rgb([255, 0, 0]))
        .save(dir.join("frame_002.png"))
        .unwrap();
    RgbImage::from_pixel(16, 12, Rgb([0, 255, 0]))
        .save(dir.join("frame_001.png"))
        .unwrap();
    std::fs::write(dir.join("broken.png"), b"not a png").unwrap();
    std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

    let target = Resolution::new(4, 3);
    let mut frames = ImageSequenceSource::open(&dir, target).unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames.reported_fps(), None);

    let first = frames.next_frame().into_frame().unwrap();
    assert_eq!(first.seq(), 0);
    assert_eq!((first.width(), first.height()), (4, 3));
    assert_eq!(first.image().get_pixel(1, 1).0, [0, 255, 0]);

    let second = frames.next_frame().into_frame().unwrap();
    assert_eq!(second.seq(), 1);
    assert_eq!(second.image().get_pixel(1, 1).0, [255, 0, 0]);

    assert!(matches!(frames.next_frame(), Next::EndOfStream));

    frames.restart().unwrap();
    assert_eq!(frames.next_frame().into_frame().map(|f| f.seq()), Some(0));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_image_sequence_rejects_empty_directory() {
    let dir = scratch_dir("empty");
    assert!(ImageSequenceSource::open(&dir, Resolution::new(4, 3)).is_err());
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_pattern_loops_through_scheduler() {
    let plan = BufferPlan::new(1_000, 0.01, 0.01);
    let source = PatternSource::new(Resolution::new(8, 2), 20);
    let ctx = PlaybackContext::new(source, NullSink::new(), plan, FillMode::Inline).unwrap();
    let mut scheduler = PlaybackScheduler::new(ctx, PacingPolicy::DriftTolerant);

    let mut restarts_seen = 0;
    for _ in 0..200 {
        if scheduler.step().unwrap() == PlaybackState::Restarting {
            restarts_seen += 1;
        }
        if scheduler.context().sink().rendered() >= 45 {
            break;
        }
    }

    assert_eq!(scheduler.context().sink().rendered(), 45);
    assert_eq!(restarts_seen, 2);
    assert_eq!(scheduler.played(), 45);
    scheduler.stop();
    assert_eq!(scheduler.state(), PlaybackState::Stopped);
}

#[test]
fn test_ffmpeg_source_decodes_resizes_and_loops() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg/ffprobe not installed, skipping");
        return;
    }

    let dir = scratch_dir("ffmpeg");
    let input = dir.join("testsrc.mp4");
    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i", "testsrc=duration=1:size=64x48:rate=10", "-c:v", "mpeg4"])
        .arg(&input)
        .output()
        .expect("Failed to execute ffmpeg");
    if !status.status.success() {
        eprintln!("FFmpeg stderr: {}", String::from_utf8_lossy(&status.stderr));
        panic!("Failed to create test video");
    }

    let info = source::probe(&input).unwrap();
    assert_eq!(info.native, Resolution::new(64, 48));
    assert!((info.fps.unwrap() - 10.0).abs() < 0.01);

    let target = Resolution::new(32, 24);
    let mut video = FfmpegSource::open(&input, target).unwrap();
    assert!(video.is_seekable());
    assert_eq!(video.reported_fps().map(|f| f.round()), Some(10.0));

    let mut decoded = 0;
    while let Next::Frame(frame) = video.next_frame() {
        assert_eq!(frame.seq(), decoded);
        assert_eq!((frame.width(), frame.height()), (32, 24));
        decoded += 1;
    }
    assert_eq!(decoded, 10);

    video.restart().unwrap();
    assert_eq!(video.next_frame().into_frame().map(|f| f.seq()), Some(0));
    video.release();
    assert!(matches!(video.next_frame(), Next::EndOfStream));

    let _ = std::fs::remove_dir_all(dir);
}
