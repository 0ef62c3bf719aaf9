//! Process-wide shutdown signal.
//!
//! One [`ShutdownController`] is shared by every task a process spawns. Loops
//! `select!` on a broadcast receiver from [`ShutdownController::subscribe`];
//! code that starts after the signal fired can still observe it through
//! [`ShutdownController::is_triggered`], which the broadcast alone would miss.

use tokio::signal;
use tokio::sync::{broadcast, watch};

#[derive(Clone)]
pub struct ShutdownController {
    notify: broadcast::Sender<()>,
    state: watch::Sender<bool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(1);
        let (state, _) = watch::channel(false);
        Self { notify, state }
    }

    /// Receiver notified once when shutdown fires.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notify.subscribe()
    }

    pub fn is_triggered(&self) -> bool {
        *self.state.borrow()
    }

    /// Fire the signal. Idempotent: only the first call notifies receivers.
    pub fn shutdown(&self) {
        if self.state.send_replace(true) {
            return;
        }
        tracing::debug!(receivers = self.notify.receiver_count(), "shutdown triggered");
        let _ = self.notify.send(());
    }

    /// Resolves once shutdown has fired, including when it fired earlier.
    pub async fn triggered(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this only errors if `self` is gone.
        let _ = rx.wait_for(|fired| *fired).await;
    }

    /// Wait for SIGINT, SIGTERM or a programmatic [`shutdown`](Self::shutdown),
    /// then make sure every subscriber has been notified.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for SIGINT");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "cannot install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("SIGINT received"),
            _ = terminate => tracing::info!("SIGTERM received"),
            _ = self.triggered() => tracing::info!("shutdown requested internally"),
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
