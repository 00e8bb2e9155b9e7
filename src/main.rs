// SYNOID Panel Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;

use synoid_panel::config::PanelConfig;
use synoid_panel::engine::filler::FillMode;
use synoid_panel::engine::pacing::PacingPolicy;
use synoid_panel::engine::scheduler::{PlaybackContext, PlaybackScheduler};
use synoid_panel::engine::Resolution;
use synoid_panel::signals;
use synoid_panel::sink::{DisplaySink, FramebufferSink, NullSink};
use synoid_panel::source::{self, FfmpegSource, FrameSource, ImageSequenceSource, PatternSource};

const DEFAULT_DEVICE: &str = "/dev/fb1";

#[derive(Parser)]
#[command(name = "synoid-panel")]
#[command(about = "Stream looping video to a small SPI display", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a video file, a directory of frames, or `-` for stdin
    Play {
        /// Input video, frame directory, or `-`
        input: PathBuf,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Play scrolling colour bars for panel bring-up
    Pattern {
        /// Frames in one loop of the pattern
        #[arg(long, default_value_t = 600)]
        frames: u64,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Print native size and frame rate of a video
    Probe {
        /// Input video path
        input: PathBuf,
    },
}

#[derive(Args)]
struct DisplayArgs {
    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Framebuffer device (defaults to $SYNOID_PANEL_DEVICE or /dev/fb1)
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Panel width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Panel height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Nominal frame rate when the source reports none
    #[arg(long)]
    fps: Option<u32>,

    /// Seconds of video loaded before playback starts
    #[arg(long)]
    initial_seconds: Option<f64>,

    /// Seconds of video kept buffered during playback
    #[arg(long)]
    buffer_seconds: Option<f64>,

    /// Pacing policy: drift or catch-up
    #[arg(long)]
    pacing: Option<PacingPolicy>,

    /// Where decoding runs: inline or worker
    #[arg(long)]
    fill: Option<FillMode>,

    /// Decode and pace without touching the display
    #[arg(long)]
    dry_run: bool,
}

impl DisplayArgs {
    fn config(&self) -> anyhow::Result<PanelConfig> {
        let mut config = match &self.config {
            Some(path) => PanelConfig::load(path)?,
            None => PanelConfig::default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(seconds) = self.initial_seconds {
            config.initial_seconds = seconds;
        }
        if let Some(seconds) = self.buffer_seconds {
            config.buffer_seconds = seconds;
        }
        if let Some(pacing) = self.pacing {
            config.pacing = pacing;
        }
        if let Some(fill) = self.fill {
            config.fill = fill;
        }

        config.validate()?;
        Ok(config)
    }

    fn device(&self) -> PathBuf {
        self.device.clone().unwrap_or_else(|| {
            std::env::var("SYNOID_PANEL_DEVICE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DEVICE))
        })
    }

    fn sink(&self, resolution: Resolution) -> anyhow::Result<Box<dyn DisplaySink + Send>> {
        if self.dry_run {
            info!("[SINK] Dry run: frames are decoded and paced but not displayed");
            return Ok(Box::new(NullSink::new()));
        }
        let device = self.device();
        let sink = FramebufferSink::open(&device, resolution)
            .with_context(|| format!("opening framebuffer {}", device.display()))?;
        Ok(Box::new(sink))
    }
}

fn open_source(input: &Path, resolution: Resolution) -> anyhow::Result<Box<dyn FrameSource>> {
    if input.is_dir() {
        let frames = ImageSequenceSource::open(input, resolution)
            .with_context(|| format!("scanning frames in {}", input.display()))?;
        return Ok(Box::new(frames));
    }
    let video = FfmpegSource::open(input, resolution)
        .with_context(|| format!("opening video {}", input.display()))?;
    Ok(Box::new(video))
}

async fn play(source: Box<dyn FrameSource>, display: &DisplayArgs, config: PanelConfig) -> anyhow::Result<()> {
    let plan = config.plan(source.reported_fps());
    if source.reported_fps().is_some() && plan.fps != config.fps {
        info!("[PLAYBACK] Detected video FPS: {}", plan.fps);
    }

    let sink = display.sink(config.resolution())?;
    let ctx = PlaybackContext::new(source, sink, plan, config.fill).context("starting frame loader")?;
    let mut scheduler = PlaybackScheduler::new(ctx, config.pacing);

    let stop = signals::install_stop_handler();
    let summary = tokio::task::spawn_blocking(move || scheduler.run(&stop))
        .await
        .context("playback thread panicked")??;

    info!(
        "[PLAYBACK] Done: {} played, {} skipped, {} loops, {} overruns, {} evicted in {:.1}s",
        summary.played,
        summary.skipped,
        summary.restarts,
        summary.overruns,
        summary.evicted,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("🚨 [SYNOID PANEL PANIC] at {}: {}", location, message);
    }));

    let args = Cli::parse();

    match args.command {
        Commands::Play { input, display } => {
            let config = display.config()?;
            let source = open_source(&input, config.resolution())?;
            play(source, &display, config).await?;
        }
        Commands::Pattern { frames, display } => {
            let config = display.config()?;
            let source = PatternSource::new(config.resolution(), frames.max(1));
            play(Box::new(source), &display, config).await?;
        }
        Commands::Probe { input } => {
            let info = source::probe(&input).with_context(|| format!("probing {}", input.display()))?;
            println!("{}: {} native", input.display(), info.native);
            match info.fps {
                Some(fps) => println!("Reported frame rate: {:.3} fps", fps),
                None => println!("Reported frame rate: unknown"),
            }
        }
    }

    Ok(())
}
