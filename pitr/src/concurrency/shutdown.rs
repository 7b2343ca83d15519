use tokio::sync::watch;

use crate::concurrency::signal::{SignalRx, SignalTx, create_signal};

/// Requests a graceful stop of the collector.
///
/// A stop is only honored between binlogs, so the cursor always matches the archive.
#[derive(Debug, Clone)]
pub struct ShutdownTx(SignalTx);

impl ShutdownTx {
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

pub type ShutdownRx = SignalRx;

/// Returns `true` if a shutdown was requested since `rx` last observed the channel.
pub fn is_shutdown_requested(rx: &ShutdownRx) -> bool {
    // Once every sender is gone nobody can request a stop anymore.
    rx.has_changed().unwrap_or(false)
}

pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = create_signal();
    (ShutdownTx(tx), rx)
}
