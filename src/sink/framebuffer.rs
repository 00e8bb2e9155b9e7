// SYNOID Panel Framebuffer Sink
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Blits frames to a Linux framebuffer device. SPI panels driven by fbtft
// (ILI9341 and friends) show up as /dev/fbN and expect RGB565 pixels; the
// kernel driver owns the bus, reset and DC lines.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use image::RgbImage;
use rayon::prelude::*;
use tracing::{info, warn};

use super::DisplaySink;
use crate::engine::{Frame, Resolution};

/// Log every Nth failed write after the first one.
const FAILURE_LOG_EVERY: u64 = 300;

/// Pack an RGB8 image into little-endian RGB565, one row per rayon task.
pub fn to_rgb565_le(image: &RgbImage, out: &mut Vec<u8>) {
    let width = image.width() as usize;
    let row_in = width * 3;
    let row_out = width * 2;
    out.resize(row_out * image.height() as usize, 0);
    if width == 0 {
        return;
    }

    out.par_chunks_mut(row_out)
        .zip(image.as_raw().par_chunks(row_in))
        .for_each(|(dst, src)| {
            for (px, rgb) in dst.chunks_exact_mut(2).zip(src.chunks_exact(3)) {
                let value = ((rgb[0] as u16 & 0xF8) << 8) | ((rgb[1] as u16 & 0xFC) << 3) | (rgb[2] as u16 >> 3);
                px.copy_from_slice(&value.to_le_bytes());
            }
        });
}

/// RGB565 writer for a framebuffer device.
pub struct FramebufferSink {
    device: File,
    path: PathBuf,
    resolution: Resolution,
    scratch: Vec<u8>,
    rendered: u64,
    failures: u64,
}

impl FramebufferSink {
    pub fn open(path: &Path, resolution: Resolution) -> std::io::Result<Self> {
        let device = OpenOptions::new().write(true).open(path)?;
        info!("[SINK] Framebuffer {:?} opened at {}", path, resolution);
        Ok(Self {
            device,
            path: path.to_path_buf(),
            resolution,
            scratch: Vec::with_capacity(resolution.pixels() * 2),
            rendered: 0,
            failures: 0,
        })
    }

    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    fn blit(&mut self, frame: &Frame) -> std::io::Result<()> {
        to_rgb565_le(frame.image(), &mut self.scratch);
        self.device.seek(SeekFrom::Start(0))?;
        self.device.write_all(&self.scratch)?;
        self.device.flush()
    }
}

impl DisplaySink for FramebufferSink {
    fn render(&mut self, frame: Frame) {
        if frame.width() != self.resolution.width || frame.height() != self.resolution.height {
            warn!(
                "[SINK] Frame {}x{} does not match panel {}, dropping",
                frame.width(),
                frame.height(),
                self.resolution
            );
            self.failures += 1;
            return;
        }

        match self.blit(&frame) {
            Ok(()) => self.rendered += 1,
            Err(e) => {
                self.failures += 1;
                if self.failures == 1 || self.failures % FAILURE_LOG_EVERY == 0 {
                    warn!(
                        "[SINK] Write to {:?} failed ({} failures so far): {}",
                        self.path, self.failures, e
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_rgb565_packing() {
        let mut image = RgbImage::new(3, 2);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(1, 0, Rgb([0, 255, 0]));
        image.put_pixel(2, 0, Rgb([0, 0, 255]));
        image.put_pixel(0, 1, Rgb([255, 255, 255]));

        let mut out = Vec::new();
        to_rgb565_le(&image, &mut out);

        assert_eq!(out.len(), 3 * 2 * 2);
        assert_eq!(&out[0..2], &0xF800u16.to_le_bytes());
        assert_eq!(&out[2..4], &0x07E0u16.to_le_bytes());
        assert_eq!(&out[4..6], &0x001Fu16.to_le_bytes());
        assert_eq!(&out[6..8], &0xFFFFu16.to_le_bytes());
        assert_eq!(&out[8..10], &[0, 0]);
    }

    #[test]
    fn test_sink_writes_whole_frame_from_offset_zero() {
        let path = std::env::temp_dir().join(format!("synoid_panel_fb_{}", std::process::id()));
        std::fs::write(&path, b"").unwrap();

        let resolution = Resolution::new(4, 2);
        let mut sink = FramebufferSink::open(&path, resolution).unwrap();
        for seq in 0..3 {
            let image = RgbImage::from_pixel(4, 2, Rgb([255, 255, 255]));
            sink.render(Frame::new(seq, image));
        }
        sink.render(Frame::new(9, RgbImage::new(2, 2)));

        assert_eq!(sink.rendered(), 3);
        assert_eq!(sink.failures(), 1);
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written.len(), 4 * 2 * 2);
        assert!(written.iter().all(|b| *b == 0xFF));

        let _ = std::fs::remove_file(path);
    }
}
