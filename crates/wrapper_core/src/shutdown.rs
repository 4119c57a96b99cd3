//! Cooperative shutdown.
//!
//! Every long-running loop holds a [`ShutdownSignal`] and selects on it next
//! to its blocking read. Triggering (or dropping) the [`ShutdownTrigger`]
//! makes those reads return promptly.

use tokio::sync::watch;

/// Sending side. Dropping it counts as a shutdown request.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Receiving side, cheap to clone into each task.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Creates a connected trigger/signal pair.
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal { rx: self.tx.subscribe() }
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested.
    pub async fn wait(&mut self) {
        // An error means the trigger was dropped, which is also a shutdown.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}
