// SYNOID Panel Engine
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Streaming frame buffer and pacing engine: the frame type that flows from
// source to panel, the bounded buffer, the fillers and the playback scheduler.

pub mod buffer;
pub mod filler;
pub mod pacing;
pub mod scheduler;
pub mod worker;

use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Fixed panel resolution every frame is normalized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels in one frame.
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single display-ready frame flowing from the decoder to the panel.
///
/// Frames are produced once, queued in the buffer, rendered once and then
/// dropped. They are deliberately not `Clone`.
#[derive(Debug)]
pub struct Frame {
    /// Source cursor position, 0-based since the last restart
    seq: u64,
    /// RGB8 pixels at the panel resolution
    image: RgbImage,
}

impl Frame {
    /// Wrap an already normalized image.
    pub fn new(seq: u64, image: RgbImage) -> Self {
        Self { seq, image }
    }

    /// Build a frame from a decoded image, resizing only if its native size
    /// differs from the panel resolution.
    pub fn normalized(seq: u64, image: RgbImage, target: Resolution) -> Self {
        let image = if image.width() != target.width || image.height() != target.height {
            imageops::resize(&image, target.width, target.height, FilterType::Triangle)
        } else {
            image
        };
        Self { seq, image }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}
