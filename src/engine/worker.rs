// SYNOID Panel Fill Worker
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Runs the frame source on its own thread so decode bursts cannot stall the
// playback cadence. The scheduler talks to it over a request channel; every
// request carries a ticket and the worker answers on a report channel. The
// frames themselves travel through the shared buffer, not the channel.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use super::buffer::SharedFrameBuffer;
use super::filler::{BufferFiller, Loader, TopUp};
use crate::source::{FrameSource, SourceError};

#[derive(Debug)]
enum FillRequest {
    WarmUp { ticket: u64, frames: usize },
    TopUp { ticket: u64, frames: usize },
    Recover { ticket: u64 },
    Restart { ticket: u64, frames: usize },
    Shutdown,
}

#[derive(Debug)]
enum FillReport {
    Loaded { ticket: u64, count: usize },
    Recovered { ticket: u64, resumed: bool },
    Restarted { ticket: u64, result: Result<usize, SourceError> },
}

impl FillReport {
    fn ticket(&self) -> u64 {
        match self {
            FillReport::Loaded { ticket, .. }
            | FillReport::Recovered { ticket, .. }
            | FillReport::Restarted { ticket, .. } => *ticket,
        }
    }
}

/// Loader backed by a dedicated decode thread.
pub struct FillWorker {
    requests: Sender<FillRequest>,
    reports: Receiver<FillReport>,
    handle: Option<JoinHandle<()>>,
    next_ticket: u64,
    /// Ticket of the top-up still running, if any
    pending_top_up: Option<u64>,
}

impl FillWorker {
    /// Move `source` onto a new fill thread that pushes into `buffer`.
    pub fn spawn<S>(source: S, buffer: SharedFrameBuffer, filler: BufferFiller) -> std::io::Result<Self>
    where
        S: FrameSource + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel();
        let (report_tx, report_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("panel-fill".to_string())
            .spawn(move || worker_loop(source, buffer, filler, request_rx, report_tx))?;

        Ok(Self {
            requests: request_tx,
            reports: report_rx,
            handle: Some(handle),
            next_ticket: 0,
            pending_top_up: None,
        })
    }

    fn send(&mut self, request: impl FnOnce(u64) -> FillRequest) -> Option<u64> {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        match self.requests.send(request(ticket)) {
            Ok(()) => Some(ticket),
            Err(_) => {
                error!("[WORKER] Fill thread is gone, request dropped");
                None
            }
        }
    }

    fn settle(&mut self, report: &FillReport) {
        if self.pending_top_up == Some(report.ticket()) {
            self.pending_top_up = None;
            if let FillReport::Loaded { count, .. } = report {
                debug!("[WORKER] Background top-up delivered {} frames", count);
            }
        }
    }

    /// Block until the report for `ticket` arrives. Reports for earlier
    /// requests that show up first are consumed along the way.
    fn wait_for(&mut self, ticket: u64) -> Option<FillReport> {
        loop {
            let report = self.reports.recv().ok()?;
            self.settle(&report);
            if report.ticket() == ticket {
                return Some(report);
            }
        }
    }

    /// Collect finished reports without blocking.
    fn poll(&mut self) {
        loop {
            match self.reports.try_recv() {
                Ok(report) => self.settle(&report),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.pending_top_up = None;
                    break;
                }
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.requests.send(FillRequest::Shutdown);
            if handle.join().is_err() {
                error!("[WORKER] Fill thread panicked");
            }
        }
    }
}

impl Loader for FillWorker {
    fn warm_up(&mut self, n: usize) -> usize {
        let Some(ticket) = self.send(|ticket| FillRequest::WarmUp { ticket, frames: n }) else {
            return 0;
        };
        match self.wait_for(ticket) {
            Some(FillReport::Loaded { count, .. }) => count,
            _ => 0,
        }
    }

    fn top_up(&mut self, n: usize) -> TopUp {
        self.poll();
        if self.pending_top_up.is_some() {
            return TopUp::Busy;
        }
        match self.send(|ticket| FillRequest::TopUp { ticket, frames: n }) {
            Some(ticket) => {
                self.pending_top_up = Some(ticket);
                TopUp::Scheduled
            }
            None => TopUp::Loaded(0),
        }
    }

    fn recover(&mut self) -> bool {
        let Some(ticket) = self.send(|ticket| FillRequest::Recover { ticket }) else {
            return false;
        };
        matches!(
            self.wait_for(ticket),
            Some(FillReport::Recovered { resumed: true, .. })
        )
    }

    fn restart(&mut self, n: usize) -> Result<usize, SourceError> {
        let ticket = self
            .send(|ticket| FillRequest::Restart { ticket, frames: n })
            .ok_or(SourceError::Disconnected)?;
        match self.wait_for(ticket) {
            Some(FillReport::Restarted { result, .. }) => result,
            _ => Err(SourceError::Disconnected),
        }
    }

    fn release(&mut self) {
        self.shutdown();
    }
}

impl Drop for FillWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<S: FrameSource>(
    mut source: S,
    buffer: SharedFrameBuffer,
    filler: BufferFiller,
    requests: Receiver<FillRequest>,
    reports: Sender<FillReport>,
) {
    info!("[WORKER] Fill thread started.");

    while let Ok(request) = requests.recv() {
        let report = match request {
            FillRequest::WarmUp { ticket, frames } => FillReport::Loaded {
                ticket,
                count: filler.warm_up(&mut source, &buffer, frames),
            },
            FillRequest::TopUp { ticket, frames } => FillReport::Loaded {
                ticket,
                count: filler.top_up(&mut source, &buffer, frames),
            },
            FillRequest::Recover { ticket } => FillReport::Recovered {
                ticket,
                resumed: filler.recover(&mut source, &buffer),
            },
            FillRequest::Restart { ticket, frames } => FillReport::Restarted {
                ticket,
                result: filler.restart(&mut source, &buffer, frames),
            },
            FillRequest::Shutdown => break,
        };

        if reports.send(report).is_err() {
            warn!("[WORKER] Scheduler went away, stopping fill thread");
            break;
        }
    }

    source.release();
    info!("[WORKER] Fill thread stopped.");
}
