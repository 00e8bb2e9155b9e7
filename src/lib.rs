// SYNOID Panel
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Streams decoded video to a small fixed-resolution SPI panel at a steady
// frame rate, looping forever.

pub mod config;
pub mod engine;
pub mod signals;
pub mod sink;
pub mod source;

pub use config::{BufferPlan, PanelConfig};
pub use engine::buffer::{FrameBuffer, SharedFrameBuffer};
pub use engine::filler::FillMode;
pub use engine::pacing::PacingPolicy;
pub use engine::scheduler::{PlaybackContext, PlaybackError, PlaybackScheduler, PlaybackState, PlaybackSummary};
pub use engine::{Frame, Resolution};
