// SYNOID Panel Sources - Frame Acquisition
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// This module currently handles:
// 1. Video files and stdin decoded through an ffmpeg pipe
// 2. Directories of still frames
// 3. A synthetic test pattern for panel bring-up

pub mod ffmpeg;
pub mod pattern;
pub mod sequence;

pub use ffmpeg::{probe, FfmpegSource, ProbeInfo};
pub use pattern::PatternSource;
pub use sequence::ImageSequenceSource;

use crate::engine::Frame;

/// Outcome of asking a source for its next frame.
#[derive(Debug)]
pub enum Next {
    Frame(Frame),
    /// No frames remain at the current cursor. Not an error.
    EndOfStream,
}

impl Next {
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Next::Frame(frame) => Some(frame),
            Next::EndOfStream => None,
        }
    }
}

/// Errors raised by a frame source.
#[derive(Debug)]
pub enum SourceError {
    /// The media cannot be repositioned to its first frame.
    NotSeekable(String),
    /// ffprobe could not describe the input.
    Probe(String),
    /// The decoder process or input could not be opened.
    Io(std::io::Error),
    /// The fill worker owning the source went away.
    Disconnected,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::NotSeekable(input) => {
                write!(f, "source '{}' is not seekable and cannot loop", input)
            }
            SourceError::Probe(msg) => write!(f, "probe failed: {}", msg),
            SourceError::Io(e) => write!(f, "source I/O error: {}", e),
            SourceError::Disconnected => write!(f, "fill worker disconnected"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        SourceError::Io(e)
    }
}

/// A decode pipeline producing display-ready frames.
///
/// `Send` so the source can be handed to a fill worker thread.
pub trait FrameSource: Send {
    /// Pull, normalize and return the next frame.
    fn next_frame(&mut self) -> Next;

    /// Reposition to the first frame.
    fn restart(&mut self) -> Result<(), SourceError>;

    /// Frame rate reported by the media, if known.
    fn reported_fps(&self) -> Option<f64>;

    /// Release the underlying handle. Safe to call more than once.
    fn release(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Next {
        (**self).next_frame()
    }

    fn restart(&mut self) -> Result<(), SourceError> {
        (**self).restart()
    }

    fn reported_fps(&self) -> Option<f64> {
        (**self).reported_fps()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
