use tokio::sync::watch;

/// Sending half of a broadcast signal without payload.
pub type SignalTx = watch::Sender<()>;

/// Receiving half of a broadcast signal without payload.
pub type SignalRx = watch::Receiver<()>;

pub fn create_signal() -> (SignalTx, SignalRx) {
    watch::channel(())
}
