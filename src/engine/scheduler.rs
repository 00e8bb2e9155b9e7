// SYNOID Panel Playback Scheduler
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The playback state machine. Drains the buffer into the display at a fixed
// cadence, tops the buffer up once per second of playback, and loops the
// source back to its first frame when it runs out:
//
//   WarmingUp -> Playing -> (Exhausted) -> Restarting -> Playing -> ... -> Stopped

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use super::buffer::SharedFrameBuffer;
use super::filler::{BufferFiller, FillMode, InlineLoader, Loader, TopUp};
use super::pacing::{CadenceState, Clock, PaceAction, Pacer, PacingPolicy, SystemClock};
use super::worker::FillWorker;
use crate::config::BufferPlan;
use crate::sink::DisplaySink;
use crate::source::{FrameSource, SourceError};

/// Scheduler states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Initial bulk load
    WarmingUp,
    /// Steady loop, one frame per iteration
    Playing,
    /// Buffer ran dry
    Exhausted,
    /// End of stream reached, looping back to the first frame
    Restarting,
    /// Terminal; the source has been released
    Stopped,
}

/// Conditions that end playback.
#[derive(Debug)]
pub enum PlaybackError {
    /// The source could not loop back to its start.
    Source(SourceError),
    /// The source produced no frames at all after a restart.
    EmptySource,
}

impl std::fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackError::Source(e) => write!(f, "playback cannot continue: {}", e),
            PlaybackError::EmptySource => write!(f, "source has no frames to play"),
        }
    }
}

impl std::error::Error for PlaybackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlaybackError::Source(e) => Some(e),
            PlaybackError::EmptySource => None,
        }
    }
}

impl From<SourceError> for PlaybackError {
    fn from(e: SourceError) -> Self {
        PlaybackError::Source(e)
    }
}

/// Everything playback owns: the loader (and through it the source), the
/// frame buffer, the cadence counters and the display.
pub struct PlaybackContext<K> {
    loader: Box<dyn Loader + Send>,
    buffer: SharedFrameBuffer,
    cadence: CadenceState,
    sink: K,
    plan: BufferPlan,
}

impl<K: DisplaySink> PlaybackContext<K> {
    /// Wire a source and a sink together according to `plan`.
    pub fn new<S>(source: S, sink: K, plan: BufferPlan, mode: FillMode) -> Result<Self, SourceError>
    where
        S: FrameSource + 'static,
    {
        let buffer = SharedFrameBuffer::new(plan.capacity);
        let filler = BufferFiller::new(plan.fps as usize);
        let loader: Box<dyn Loader + Send> = match mode {
            FillMode::Inline => Box::new(InlineLoader::new(source, buffer.clone(), filler)),
            FillMode::Worker => Box::new(FillWorker::spawn(source, buffer.clone(), filler)?),
        };
        Ok(Self::with_loader(loader, buffer, sink, plan))
    }

    /// Build a context around an existing loader that fills `buffer`.
    pub fn with_loader(
        loader: Box<dyn Loader + Send>,
        buffer: SharedFrameBuffer,
        sink: K,
        plan: BufferPlan,
    ) -> Self {
        Self {
            loader,
            buffer,
            cadence: CadenceState::new(plan.frame_interval(), plan.load_ahead_frames),
            sink,
            plan,
        }
    }

    pub fn buffer(&self) -> &SharedFrameBuffer {
        &self.buffer
    }

    pub fn cadence(&self) -> &CadenceState {
        &self.cadence
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn plan(&self) -> &BufferPlan {
        &self.plan
    }
}

/// Counters reported when playback ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSummary {
    pub played: u64,
    pub skipped: u64,
    pub restarts: u64,
    pub top_ups: u64,
    pub overruns: u64,
    pub evicted: u64,
    pub elapsed: Duration,
}

/// Drives a [`PlaybackContext`] through the playback state machine.
pub struct PlaybackScheduler<K, C = SystemClock> {
    ctx: PlaybackContext<K>,
    clock: C,
    pacer: Pacer,
    state: PlaybackState,
    started: Option<Instant>,
    skipped: u64,
    restarts: u64,
    top_ups: u64,
}

impl<K: DisplaySink> PlaybackScheduler<K, SystemClock> {
    pub fn new(ctx: PlaybackContext<K>, policy: PacingPolicy) -> Self {
        Self::with_clock(ctx, policy, SystemClock)
    }
}

impl<K: DisplaySink, C: Clock> PlaybackScheduler<K, C> {
    pub fn with_clock(ctx: PlaybackContext<K>, policy: PacingPolicy, clock: C) -> Self {
        let pacer = Pacer::new(policy, ctx.plan.frame_interval());
        Self {
            ctx,
            clock,
            pacer,
            state: PlaybackState::WarmingUp,
            started: None,
            skipped: 0,
            restarts: 0,
            top_ups: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn played(&self) -> u64 {
        self.ctx.cadence.played()
    }

    pub fn context(&self) -> &PlaybackContext<K> {
        &self.ctx
    }

    fn elapsed(&self) -> Duration {
        self.started
            .map(|t| self.clock.now().saturating_duration_since(t))
            .unwrap_or_default()
    }

    pub fn summary(&self) -> PlaybackSummary {
        PlaybackSummary {
            played: self.ctx.cadence.played(),
            skipped: self.skipped,
            restarts: self.restarts,
            top_ups: self.top_ups,
            overruns: self.pacer.overruns(),
            evicted: self.ctx.buffer.evicted(),
            elapsed: self.elapsed(),
        }
    }

    /// Play until `stop` is raised or a fatal error occurs. The flag is only
    /// checked between iterations, never during a display transfer.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<PlaybackSummary, PlaybackError> {
        info!(
            "[PLAYBACK] {} fps, {} initial / {} buffered frames (capacity {}), {} pacing",
            self.ctx.plan.fps,
            self.ctx.plan.initial_frames,
            self.ctx.plan.buffer_frames,
            self.ctx.plan.capacity,
            self.pacer.policy()
        );

        while !stop.load(Ordering::Relaxed) {
            if self.step()? == PlaybackState::Stopped {
                break;
            }
        }

        self.stop();
        Ok(self.summary())
    }

    /// Perform one state transition and return the new state.
    pub fn step(&mut self) -> Result<PlaybackState, PlaybackError> {
        let next = match self.state {
            PlaybackState::WarmingUp => {
                self.ctx.loader.warm_up(self.ctx.plan.initial_frames);
                info!("[PLAYBACK] Starting playback with streaming buffer...");
                PlaybackState::Playing
            }
            PlaybackState::Playing => self.play_one(),
            PlaybackState::Exhausted => {
                if self.ctx.loader.recover() {
                    debug!("[PLAYBACK] Buffer ran dry, source still has frames");
                    PlaybackState::Playing
                } else {
                    info!("[PLAYBACK] Video ended, restarting...");
                    PlaybackState::Restarting
                }
            }
            PlaybackState::Restarting => match self.ctx.loader.restart(self.ctx.plan.initial_frames) {
                // A zero-frame warm-up only means "empty" if the source also
                // has nothing to hand over directly.
                Ok(0) if !self.ctx.loader.recover() => return Err(self.fail(PlaybackError::EmptySource)),
                Ok(loaded) => {
                    self.restarts += 1;
                    info!(
                        "[PLAYBACK] 🔁 Loop #{}: {} frames reloaded | Played: {} frames",
                        self.restarts,
                        loaded,
                        self.ctx.cadence.played()
                    );
                    PlaybackState::Playing
                }
                Err(e) => return Err(self.fail(PlaybackError::Source(e))),
            },
            PlaybackState::Stopped => return Ok(PlaybackState::Stopped),
        };

        self.state = next;
        Ok(next)
    }

    fn play_one(&mut self) -> PlaybackState {
        let Some(frame) = self.ctx.buffer.pop_front() else {
            return PlaybackState::Exhausted;
        };

        let start = self.clock.now();
        self.started.get_or_insert(start);

        self.ctx.sink.render(frame);

        if self.ctx.cadence.record_played() {
            self.top_up();
        }

        let elapsed = self.clock.now().saturating_duration_since(start);
        match self.pacer.settle(elapsed) {
            PaceAction::Sleep(remaining) => self.clock.sleep(remaining),
            PaceAction::Proceed => {}
            PaceAction::Skip(frames) => {
                let dropped = (0..frames)
                    .take_while(|_| self.ctx.buffer.pop_front().is_some())
                    .count();
                self.skipped += dropped as u64;
                debug!("[PLAYBACK] Behind schedule, dropped {} frames", dropped);
                if self.ctx.cadence.record_skipped(dropped) {
                    self.top_up();
                }
            }
        }

        PlaybackState::Playing
    }

    fn top_up(&mut self) {
        let outcome = self.ctx.loader.top_up(self.ctx.plan.load_ahead_frames);
        self.ctx.cadence.rearm();
        self.top_ups += 1;

        if outcome == TopUp::Busy {
            debug!("[PLAYBACK] Previous top-up still running, skipping this one");
        }

        let played = self.ctx.cadence.played();
        info!(
            "[PLAYBACK] Buffer: {} frames | Played: {} frames ({}s) | Elapsed: {:.1}s",
            self.ctx.buffer.len(),
            played,
            played / u64::from(self.ctx.plan.fps.max(1)),
            self.elapsed().as_secs_f64()
        );
    }

    fn fail(&mut self, err: PlaybackError) -> PlaybackError {
        error!("[PLAYBACK] ❌ {}", err);
        self.stop();
        err
    }

    /// Enter `Stopped` and release the source. Idempotent.
    pub fn stop(&mut self) {
        if self.state != PlaybackState::Stopped {
            self.state = PlaybackState::Stopped;
            self.ctx.loader.release();
            info!("[PLAYBACK] Playback stopped after {} frames", self.ctx.cadence.played());
        }
    }
}
