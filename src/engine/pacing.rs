// SYNOID Panel Pacing
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Fixed-interval cadence for the playback loop: the clock abstraction, the
// per-frame cadence counters and the policy deciding what to do with the
// time left over (or overrun) after each frame.

use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Source of time for the scheduler.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Instant` and `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// What to do when a frame overruns its interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacingPolicy {
    /// Never skip frames; lateness accumulates as drift.
    #[default]
    DriftTolerant,
    /// Drop buffered frames to get back on schedule.
    CatchUp,
}

impl FromStr for PacingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drift" | "drift-tolerant" | "drifttolerant" => Ok(PacingPolicy::DriftTolerant),
            "catch-up" | "catchup" => Ok(PacingPolicy::CatchUp),
            other => Err(format!("unknown pacing policy '{}' (expected drift or catch-up)", other)),
        }
    }
}

impl std::fmt::Display for PacingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacingPolicy::DriftTolerant => write!(f, "drift-tolerant"),
            PacingPolicy::CatchUp => write!(f, "catch-up"),
        }
    }
}

/// Outcome of pacing one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceAction {
    /// Wait this long before the next frame.
    Sleep(Duration),
    /// Already late; start the next frame immediately.
    Proceed,
    /// Late by whole frames; drop this many buffered frames, then proceed.
    Skip(usize),
}

/// Turns the elapsed time of an iteration into a [`PaceAction`].
#[derive(Debug, Clone)]
pub struct Pacer {
    policy: PacingPolicy,
    interval: Duration,
    /// Overrun not yet repaid (catch-up only)
    debt: Duration,
    overruns: u64,
}

impl Pacer {
    pub fn new(policy: PacingPolicy, interval: Duration) -> Self {
        Self {
            policy,
            interval,
            debt: Duration::ZERO,
            overruns: 0,
        }
    }

    pub fn policy(&self) -> PacingPolicy {
        self.policy
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Iterations that took longer than one interval.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Decide how to finish an iteration that took `elapsed`.
    pub fn settle(&mut self, elapsed: Duration) -> PaceAction {
        if elapsed < self.interval {
            let mut spare = self.interval - elapsed;
            if self.policy == PacingPolicy::CatchUp && !self.debt.is_zero() {
                let repaid = spare.min(self.debt);
                self.debt -= repaid;
                spare -= repaid;
            }
            return if spare.is_zero() {
                PaceAction::Proceed
            } else {
                PaceAction::Sleep(spare)
            };
        }

        if elapsed > self.interval {
            self.overruns += 1;
        }

        match self.policy {
            PacingPolicy::DriftTolerant => PaceAction::Proceed,
            PacingPolicy::CatchUp => {
                self.debt += elapsed - self.interval;
                let behind = (self.debt.as_nanos() / self.interval.as_nanos().max(1)) as usize;
                if behind == 0 {
                    return PaceAction::Proceed;
                }
                self.debt -= self.interval * behind as u32;
                PaceAction::Skip(behind)
            }
        }
    }
}

/// Played-frame counter and top-up countdown, owned by the scheduler.
#[derive(Debug, Clone)]
pub struct CadenceState {
    frame_interval: Duration,
    played: u64,
    top_up_every: usize,
    until_top_up: usize,
}

impl CadenceState {
    /// `top_up_every` frames are consumed between top-ups (one second's worth).
    pub fn new(frame_interval: Duration, top_up_every: usize) -> Self {
        let top_up_every = top_up_every.max(1);
        Self {
            frame_interval,
            played: 0,
            top_up_every,
            until_top_up: top_up_every,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn played(&self) -> u64 {
        self.played
    }

    pub fn until_top_up(&self) -> usize {
        self.until_top_up
    }

    /// Count a rendered frame. Returns `true` when a top-up is due.
    pub fn record_played(&mut self) -> bool {
        self.played += 1;
        self.consume(1)
    }

    /// Count frames taken from the buffer without being shown.
    pub fn record_skipped(&mut self, frames: usize) -> bool {
        self.consume(frames)
    }

    fn consume(&mut self, frames: usize) -> bool {
        self.until_top_up = self.until_top_up.saturating_sub(frames);
        self.until_top_up == 0
    }

    /// Restart the countdown after a top-up.
    pub fn rearm(&mut self) {
        self.until_top_up = self.top_up_every;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(20);

    #[test]
    fn test_drift_tolerant_sleeps_remainder() {
        let mut pacer = Pacer::new(PacingPolicy::DriftTolerant, FRAME);
        assert_eq!(pacer.settle(Duration::from_millis(5)), PaceAction::Sleep(Duration::from_millis(15)));
        assert_eq!(pacer.settle(Duration::ZERO), PaceAction::Sleep(FRAME));
        assert_eq!(pacer.settle(FRAME), PaceAction::Proceed);
        assert_eq!(pacer.overruns(), 0);
    }

    #[test]
    fn test_drift_tolerant_never_sleeps_negative_or_skips() {
        let mut pacer = Pacer::new(PacingPolicy::DriftTolerant, FRAME);
        for _ in 0..10 {
            assert_eq!(pacer.settle(Duration::from_millis(95)), PaceAction::Proceed);
        }
        assert_eq!(pacer.overruns(), 10);
        // No debt is carried into the next on-time frame
        assert_eq!(pacer.settle(Duration::from_millis(10)), PaceAction::Sleep(Duration::from_millis(10)));
    }

    #[test]
    fn test_catch_up_skips_whole_frames_of_lateness() {
        let mut pacer = Pacer::new(PacingPolicy::CatchUp, FRAME);
        // 50ms: 30ms late, one whole frame behind, 10ms debt left
        assert_eq!(pacer.settle(Duration::from_millis(50)), PaceAction::Skip(1));
        // 25ms: 5ms more, 15ms debt, not a whole frame yet
        assert_eq!(pacer.settle(Duration::from_millis(25)), PaceAction::Proceed);
        // 5ms: 15ms spare repays the debt entirely, no sleep
        assert_eq!(pacer.settle(Duration::from_millis(5)), PaceAction::Proceed);
        // Back on schedule
        assert_eq!(pacer.settle(Duration::from_millis(5)), PaceAction::Sleep(Duration::from_millis(15)));
        assert_eq!(pacer.overruns(), 2);
    }

    #[test]
    fn test_cadence_countdown() {
        let mut cadence = CadenceState::new(FRAME, 3);
        assert!(!cadence.record_played());
        assert!(!cadence.record_played());
        assert!(cadence.record_played());
        cadence.rearm();
        assert_eq!(cadence.until_top_up(), 3);
        assert!(cadence.record_skipped(5));
        assert_eq!(cadence.played(), 3);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("drift".parse::<PacingPolicy>().unwrap(), PacingPolicy::DriftTolerant);
        assert_eq!("Catch-Up".parse::<PacingPolicy>().unwrap(), PacingPolicy::CatchUp);
        assert!("warp".parse::<PacingPolicy>().is_err());
        assert_eq!(PacingPolicy::CatchUp.to_string(), "catch-up");
    }
}
