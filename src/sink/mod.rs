// SYNOID Panel Display Sinks
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod framebuffer;

pub use framebuffer::{to_rgb565_le, FramebufferSink};

use crate::engine::Frame;

/// Something that puts one frame on the glass.
///
/// `render` blocks for the whole transfer and consumes the frame. Transport
/// failures are the sink's business: log them, never propagate them.
pub trait DisplaySink {
    fn render(&mut self, frame: Frame);
}

impl<T: DisplaySink + ?Sized> DisplaySink for Box<T> {
    fn render(&mut self, frame: Frame) {
        (**self).render(frame)
    }
}

/// Discards frames. Used for dry runs and decoder benchmarking.
#[derive(Debug, Default)]
pub struct NullSink {
    rendered: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rendered(&self) -> u64 {
        self.rendered
    }
}

impl DisplaySink for NullSink {
    fn render(&mut self, _frame: Frame) {
        self.rendered += 1;
    }
}
