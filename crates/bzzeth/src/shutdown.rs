//! Service-wide shutdown signal

use std::sync::Arc;
use tokio::sync::watch;

/// One-shot broadcast shutdown.
///
/// Closes once and stays closed. Waiters that subscribe after the close
/// return immediately.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Create an open signal
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Close the signal. Returns true only for the call that closed it.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|fired| !std::mem::replace(fired, true))
    }

    /// Whether the signal has been closed
    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the signal is closed
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
