// SYNOID Panel Configuration
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Startup configuration (JSON file, then CLI overrides) and the buffer plan
// derived from it once the source's frame rate is known.

use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

use crate::engine::filler::FillMode;
use crate::engine::pacing::PacingPolicy;
use crate::engine::Resolution;

/// Top-ups load this many seconds of frames.
pub const LOAD_AHEAD_SECONDS: u32 = 1;

/// User-facing settings, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Panel width in pixels
    pub width: u32,
    /// Panel height in pixels
    pub height: u32,
    /// Seconds of video loaded before playback starts
    pub initial_seconds: f64,
    /// Seconds of video kept buffered during playback
    pub buffer_seconds: f64,
    /// Nominal frame rate, used when the source does not report one
    pub fps: u32,
    pub pacing: PacingPolicy,
    pub fill: FillMode,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            initial_seconds: 4.0,
            buffer_seconds: 3.0,
            fps: 60,
            pacing: PacingPolicy::default(),
            fill: FillMode::default(),
        }
    }
}

impl PanelConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: PanelConfig = serde_json::from_str(&json)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.width > 0 && self.height > 0, "panel size must be non-zero, got {}x{}", self.width, self.height);
        ensure!(self.fps > 0, "fps must be positive");
        ensure!(
            self.initial_seconds.is_finite() && self.initial_seconds >= 0.0,
            "initial_seconds must be a non-negative number, got {}",
            self.initial_seconds
        );
        ensure!(
            self.buffer_seconds.is_finite() && self.buffer_seconds >= 0.0,
            "buffer_seconds must be a non-negative number, got {}",
            self.buffer_seconds
        );
        Ok(())
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Frame rate to play at: the source's reported rate when it is usable
    /// (truncated to whole frames), otherwise the configured one.
    pub fn effective_fps(&self, reported: Option<f64>) -> u32 {
        match reported {
            Some(rate) if rate.is_finite() && rate >= 1.0 => rate as u32,
            _ => self.fps.max(1),
        }
    }

    /// Derive frame counts for a source reporting `reported` fps.
    pub fn plan(&self, reported: Option<f64>) -> BufferPlan {
        BufferPlan::new(
            self.effective_fps(reported),
            self.initial_seconds,
            self.buffer_seconds,
        )
    }
}

/// Frame counts derived from the configuration and the effective fps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPlan {
    pub fps: u32,
    pub initial_frames: usize,
    pub buffer_frames: usize,
    pub load_ahead_frames: usize,
    /// `buffer_frames + load_ahead_frames`
    pub capacity: usize,
}

impl BufferPlan {
    pub fn new(fps: u32, initial_seconds: f64, buffer_seconds: f64) -> Self {
        let fps = fps.max(1);
        let frames = |seconds: f64| (seconds.max(0.0) * fps as f64).round() as usize;
        let buffer_frames = frames(buffer_seconds);
        let load_ahead_frames = (LOAD_AHEAD_SECONDS * fps) as usize;
        Self {
            fps,
            initial_frames: frames(initial_seconds),
            buffer_frames,
            load_ahead_frames,
            capacity: buffer_frames + load_ahead_frames,
        }
    }

    /// Target time between frames, `1 / fps`.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps as f64)
    }
}
