//! Orderly shutdown signal for in-flight units
//!
//! Heavyweight units wait on a crossbeam channel whose sender is dropped when
//! the signal fires; lightweight units wait on a tokio watch channel. Either
//! way a sleeping unit wakes immediately once shutdown is requested.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

struct Inner {
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
    watch: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, receiver) = channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                sender: Mutex::new(Some(sender)),
                receiver,
                watch: watch::Sender::new(false),
            }),
        }
    }

    /// Request shutdown; later calls are no-ops
    pub fn trigger(&self) {
        self.inner.sender.lock().take();
        self.inner.watch.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.watch.borrow()
    }

    /// Block the current thread for `delay` unless shutdown is requested
    ///
    /// Returns `true` when the sleep was interrupted.
    pub fn sleep_blocking(&self, delay: Duration) -> bool {
        match self.inner.receiver.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => false,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        }
    }

    /// Async counterpart of [`sleep_blocking`](Self::sleep_blocking)
    pub async fn sleep(&self, delay: Duration) -> bool {
        let mut triggered = self.inner.watch.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = triggered.wait_for(|fired| *fired) => true,
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
