// SYNOID Panel Image Sequence Source
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Plays a directory of pre-extracted still frames in lexical order.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{FrameSource, Next, SourceError};
use crate::engine::{Frame, Resolution};

const FRAME_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Still frames on disk, decoded one at a time.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    target: Resolution,
    cursor: usize,
    /// Frames handed out since the last restart
    emitted: u64,
}

impl ImageSequenceSource {
    /// Scan `dir` for frame images. Fails if the directory holds none.
    pub fn open(dir: &Path, target: Resolution) -> Result<Self, SourceError> {
        let paths = scan_frames(dir)?;
        if paths.is_empty() {
            return Err(SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no image files found in {}", dir.display()),
            )));
        }
        info!("[SOURCE] Found {} frames in {:?}", paths.len(), dir);
        Ok(Self {
            paths,
            target,
            cursor: 0,
            emitted: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn scan_frames(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_frame && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Next {
        while let Some(path) = self.paths.get(self.cursor) {
            self.cursor += 1;
            match image::open(path) {
                Ok(decoded) => {
                    let seq = self.emitted;
                    self.emitted += 1;
                    return Next::Frame(Frame::normalized(seq, decoded.to_rgb8(), self.target));
                }
                Err(e) => warn!("[SOURCE] Skipping undecodable frame {:?}: {}", path, e),
            }
        }
        Next::EndOfStream
    }

    fn restart(&mut self) -> Result<(), SourceError> {
        self.cursor = 0;
        self.emitted = 0;
        Ok(())
    }

    fn reported_fps(&self) -> Option<f64> {
        None
    }
}
