// SYNOID Panel Buffer Filler
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Moves frames from a source into the buffer in batches: a warm-up before
// playback (and after every loop restart) and a top-up once per second of
// playback. The `Loader` trait is what the scheduler drives; it is backed
// either inline on the playback thread or by a fill worker.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::buffer::SharedFrameBuffer;
use crate::source::{FrameSource, Next, SourceError};

/// Where batch loading runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillMode {
    /// On the playback thread, between frames.
    #[default]
    Inline,
    /// On a dedicated fill thread.
    Worker,
}

impl FromStr for FillMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" => Ok(FillMode::Inline),
            "worker" | "thread" => Ok(FillMode::Worker),
            other => Err(format!("unknown fill mode '{}' (expected inline or worker)", other)),
        }
    }
}

impl std::fmt::Display for FillMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FillMode::Inline => write!(f, "inline"),
            FillMode::Worker => write!(f, "worker"),
        }
    }
}

/// Batch loading mechanics shared by both fill modes.
#[derive(Debug, Clone, Copy)]
pub struct BufferFiller {
    /// Frames per second, for progress reporting
    fps: usize,
}

impl BufferFiller {
    pub fn new(fps: usize) -> Self {
        Self { fps: fps.max(1) }
    }

    /// Load up to `n` frames before playback. Returns how many were loaded.
    pub fn warm_up<S: FrameSource + ?Sized>(&self, source: &mut S, buffer: &SharedFrameBuffer, n: usize) -> usize {
        info!(
            "[FILLER] Loading initial {:.1} seconds ({} frames)...",
            n as f64 / self.fps as f64,
            n
        );

        let mut loaded = 0;
        while loaded < n {
            match source.next_frame() {
                Next::Frame(frame) => {
                    buffer.try_push(frame);
                    loaded += 1;
                    if loaded % self.fps == 0 {
                        debug!("[FILLER] Loaded {} seconds...", loaded / self.fps);
                    }
                }
                Next::EndOfStream => {
                    info!(
                        "[FILLER] Video is shorter than {:.1} seconds ({} frames)",
                        n as f64 / self.fps as f64,
                        loaded
                    );
                    break;
                }
            }
        }

        info!("[FILLER] Initial buffer loaded: {} frames", buffer.len());
        loaded
    }

    /// Load up to `n` more frames during playback, stopping quietly at the
    /// end of the stream.
    pub fn top_up<S: FrameSource + ?Sized>(&self, source: &mut S, buffer: &SharedFrameBuffer, n: usize) -> usize {
        let mut loaded = 0;
        while loaded < n {
            match source.next_frame() {
                Next::Frame(frame) => {
                    buffer.try_push(frame);
                    loaded += 1;
                }
                Next::EndOfStream => break,
            }
        }
        loaded
    }

    /// Pull a single frame straight from the source after the buffer ran dry.
    /// Returns `false` at the end of the stream.
    pub fn recover<S: FrameSource + ?Sized>(&self, source: &mut S, buffer: &SharedFrameBuffer) -> bool {
        match source.next_frame() {
            Next::Frame(frame) => {
                buffer.try_push(frame);
                true
            }
            Next::EndOfStream => false,
        }
    }

    /// Rewind the source, empty the buffer and warm up again.
    pub fn restart<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        buffer: &SharedFrameBuffer,
        n: usize,
    ) -> Result<usize, SourceError> {
        source.restart()?;
        buffer.clear();
        Ok(self.warm_up(source, buffer, n))
    }
}

/// Result of asking a loader for a top-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopUp {
    /// Loaded synchronously.
    Loaded(usize),
    /// Handed to the fill worker; frames arrive in the background.
    Scheduled,
    /// A previous top-up is still running.
    Busy,
}

/// Frame loading as driven by the playback scheduler.
pub trait Loader {
    /// Blocking initial load. Returns frames loaded.
    fn warm_up(&mut self, n: usize) -> usize;

    /// Periodic refill during playback.
    fn top_up(&mut self, n: usize) -> TopUp;

    /// Buffer ran dry: try one frame directly. `false` means end of stream.
    fn recover(&mut self) -> bool;

    /// Loop back to the first frame and warm up. Blocking.
    fn restart(&mut self, n: usize) -> Result<usize, SourceError>;

    /// Release the source. No further calls follow.
    fn release(&mut self);
}

/// Loader that decodes on the calling thread.
pub struct InlineLoader<S> {
    source: S,
    buffer: SharedFrameBuffer,
    filler: BufferFiller,
    released: bool,
}

impl<S: FrameSource> InlineLoader<S> {
    pub fn new(source: S, buffer: SharedFrameBuffer, filler: BufferFiller) -> Self {
        Self {
            source,
            buffer,
            filler,
            released: false,
        }
    }
}

impl<S: FrameSource> Loader for InlineLoader<S> {
    fn warm_up(&mut self, n: usize) -> usize {
        self.filler.warm_up(&mut self.source, &self.buffer, n)
    }

    fn top_up(&mut self, n: usize) -> TopUp {
        TopUp::Loaded(self.filler.top_up(&mut self.source, &self.buffer, n))
    }

    fn recover(&mut self) -> bool {
        self.filler.recover(&mut self.source, &self.buffer)
    }

    fn restart(&mut self, n: usize) -> Result<usize, SourceError> {
        self.filler.restart(&mut self.source, &self.buffer, n)
    }

    fn release(&mut self) {
        if !self.released {
            self.source.release();
            self.released = true;
        }
    }
}
