//! Cancellation-token pair shared by the Scheduler (creates them per
//! in-flight load) and the RangeCache (aborts them on eviction).
//!
//! Backed by `tokio::sync::watch` (already pulled in with the `sync`
//! feature for wasm32) rather than a hand-rolled atomic flag.

use tokio::sync::watch;

#[derive(Debug)]
pub struct AbortHandle(watch::Sender<bool>);

#[derive(Debug, Clone)]
pub struct AbortSignal(watch::Receiver<bool>);

pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle(tx), AbortSignal(rx))
}

impl AbortHandle {
    pub fn abort(&self) {
        // A closed receiver (the load already finished) is not an error.
        let _ = self.0.send(true);
    }
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once `abort()` has been called on the paired handle.
    pub async fn aborted(&mut self) {
        loop {
            if *self.0.borrow() {
                return;
            }
            if self.0.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn abort_signals_receiver() {
        let (handle, mut signal) = abort_pair();
        assert!(!signal.is_aborted());
        handle.abort();
        signal.aborted().await;
        assert!(signal.is_aborted());
    }
}
