//! Graceful shutdown

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

/// One-shot, cloneable shutdown flag.
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            info!("Shutdown signal triggered");
            let _ = self.sender.send(());
        }
    }

    /// Resolves once shutdown is triggered, including when it already was.
    pub async fn wait(&self) {
        let mut rx = self.sender.subscribe();
        if self.is_triggered() {
            return;
        }
        let _ = rx.recv().await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves on SIGTERM or SIGINT (Ctrl+C elsewhere).
async fn os_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        if let (Ok(mut term), Ok(mut int)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            tokio::select! {
                _ = term.recv() => info!("Received SIGTERM"),
                _ = int.recv() => info!("Received SIGINT"),
            }
            return;
        }
        warn!("Unix signal handlers unavailable, falling back to Ctrl+C");
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
    }
}

/// Owns the process-wide [`ShutdownSignal`] and the drain timeout.
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    drain_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            signal: ShutdownSignal::new(),
            drain_timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    /// Trigger the signal when the OS asks the process to stop.
    pub fn start_signal_listener(&self) {
        let signal = self.signal.clone();
        tokio::spawn(async move {
            os_shutdown_signal().await;
            signal.trigger();
        });
    }

    /// Wait for the signal, then run `drain` within the timeout.
    /// Returns `false` when the timeout cut it short.
    pub async fn shutdown_with_cleanup<F, Fut>(&self, drain: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        self.signal.wait().await;
        info!(timeout = ?self.drain_timeout, "Draining before shutdown");

        let finished = tokio::time::timeout(self.drain_timeout, drain()).await.is_ok();
        if !finished {
            warn!(timeout = ?self.drain_timeout, "Shutdown drain timed out");
        }
        finished
    }
}
