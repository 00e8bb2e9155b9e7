// SYNOID Panel Signal Handling
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Turns Ctrl-C into a stop flag the playback loop checks between frames, so
// a transfer in progress always completes and the decoder is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

/// Spawn a background task that raises the returned flag on Ctrl-C.
///
/// Must be called from within a tokio runtime.
pub fn install_stop_handler() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("[SIGNAL] ⛔ SIGINT (Ctrl-C) received. Stopping after the current frame...");
                flag.store(true, Ordering::Relaxed);
            }
            Err(e) => {
                warn!("[SIGNAL] Failed to install Ctrl-C handler: {}", e);
            }
        }
    });

    info!("[SIGNAL] Ctrl-C handler installed");
    stop
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flag_starts_lowered() {
        let stop = install_stop_handler();
        assert!(!stop.load(Ordering::Relaxed));
    }
}
