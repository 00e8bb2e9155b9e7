// SYNOID Panel Test Pattern
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Synthetic scrolling colour bars. Needs no decoder, so it is the quickest
// way to check wiring, orientation and cadence on a fresh panel.

use image::{Rgb, RgbImage};

use super::{FrameSource, Next, SourceError};
use crate::engine::{Frame, Resolution};

const BARS: [[u8; 3]; 8] = [
    [255, 255, 255],
    [255, 255, 0],
    [0, 255, 255],
    [0, 255, 0],
    [255, 0, 255],
    [255, 0, 0],
    [0, 0, 255],
    [0, 0, 0],
];

/// Finite, always seekable source of colour bar frames.
pub struct PatternSource {
    target: Resolution,
    total: u64,
    cursor: u64,
}

impl PatternSource {
    /// A pattern of `total` frames; the bars shift by one pixel per frame.
    pub fn new(target: Resolution, total: u64) -> Self {
        Self {
            target,
            total,
            cursor: 0,
        }
    }

    fn render(&self, seq: u64) -> RgbImage {
        let bar_width = (self.target.width / BARS.len() as u32).max(1);
        let offset = seq as u32;
        RgbImage::from_fn(self.target.width, self.target.height, |x, _y| {
            let bar = ((x.wrapping_add(offset)) / bar_width) as usize % BARS.len();
            Rgb(BARS[bar])
        })
    }
}

impl FrameSource for PatternSource {
    fn next_frame(&mut self) -> Next {
        if self.cursor >= self.total {
            return Next::EndOfStream;
        }
        let seq = self.cursor;
        self.cursor += 1;
        Next::Frame(Frame::new(seq, self.render(seq)))
    }

    fn restart(&mut self) -> Result<(), SourceError> {
        self.cursor = 0;
        Ok(())
    }

    fn reported_fps(&self) -> Option<f64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_finite_and_restartable() {
        let mut source = PatternSource::new(Resolution::new(16, 4), 3);
        let seqs: Vec<u64> = std::iter::from_fn(|| source.next_frame().into_frame())
            .map(|f| f.seq())
            .collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert!(matches!(source.next_frame(), Next::EndOfStream));

        source.restart().unwrap();
        let first = source.next_frame().into_frame().unwrap();
        assert_eq!(first.seq(), 0);
        assert_eq!((first.width(), first.height()), (16, 4));
    }

    #[test]
    fn test_bars_scroll() {
        let source = PatternSource::new(Resolution::new(16, 1), 10);
        let a = source.render(0);
        let b = source.render(1);
        // Bar width is 2 pixels; shifting by one moves the boundary
        assert_eq!(a.get_pixel(1, 0), b.get_pixel(0, 0));
        assert_ne!(a.get_pixel(1, 0), b.get_pixel(1, 0));
    }
}
