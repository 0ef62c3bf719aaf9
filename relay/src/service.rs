//! The relay service: provider registration, the listener task, the drain
//! loop and orderly shutdown.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fundrelay_utils::ShutdownController;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::RelayConfig;
use crate::drain::Drainer;
use crate::error::RelayError;
use crate::ledger::{EventSource, LedgerClient};
use crate::metrics::{metrics_router, serve_metrics, RelayMetrics};
use crate::queue::{RequestQueue, VerificationRequest};
use crate::source::DataSource;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle of a relay. `Running` and `Draining` alternate while it works.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Starting,
    Running,
    Draining,
    ShuttingDown,
    Stopped,
}

impl ServiceState {
    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Running | Self::Draining)
    }
}

pub struct RelayService {
    config: RelayConfig,
    ledger: Arc<dyn LedgerClient>,
    drainer: Arc<Drainer>,
    queue: RequestQueue,
    metrics: Arc<RelayMetrics>,
    state: Arc<watch::Sender<ServiceState>>,
    shutdown: ShutdownController,
    cancel: Arc<AtomicBool>,
    task_handles: Vec<JoinHandle<()>>,
    registered: bool,
}

impl RelayService {
    pub fn new(
        config: RelayConfig,
        source: Arc<dyn DataSource>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Result<Self, RelayError> {
        config.validate()?;
        let metrics = Arc::new(RelayMetrics::new());
        let drainer = Arc::new(Drainer::new(
            &config,
            source,
            Arc::clone(&ledger),
            Arc::clone(&metrics),
        ));
        let (state, _) = watch::channel(ServiceState::Starting);
        Ok(Self {
            config,
            ledger,
            drainer,
            queue: RequestQueue::new(),
            metrics,
            state: Arc::new(state),
            shutdown: ShutdownController::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            task_handles: Vec::new(),
            registered: false,
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// Watch the lifecycle state.
    pub fn state(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Register as a provider, then start consuming `events` and draining.
    ///
    /// Registration failure is returned and nothing is spawned.
    pub async fn start(&mut self, events: Box<dyn EventSource>) -> Result<(), RelayError> {
        if self.registered || !self.task_handles.is_empty() {
            return Err(RelayError::AlreadyStarted);
        }

        let provider = self.config.provider;
        if let Err(e) = self.ledger.add_provider(provider).await {
            tracing::error!(%provider, error = %e, "provider registration failed");
            self.state.send_replace(ServiceState::Stopped);
            return Err(RelayError::Registration(e));
        }
        self.registered = true;
        tracing::info!(%provider, "registered as verification provider");

        self.spawn_listener(events);
        self.spawn_drain_loop();

        if let Some(port) = self.config.metrics_port {
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let router = metrics_router(Arc::clone(&self.metrics), self.state.subscribe());
            let shutdown_rx = self.shutdown.subscribe();
            self.task_handles.push(tokio::spawn(async move {
                if let Err(e) = serve_metrics(addr, router, shutdown_rx).await {
                    tracing::error!(error = %e, "relay metrics server failed");
                }
            }));
        }

        self.state.send_replace(ServiceState::Running);
        tracing::info!(
            interval_ms = self.config.drain_interval_ms,
            batch_size = self.config.batch_size,
            max_attempts = self.config.max_attempts,
            "relay running"
        );
        Ok(())
    }

    fn spawn_listener(&mut self, mut events: Box<dyn EventSource>) {
        let queue = self.queue.clone();
        let metrics = Arc::clone(&self.metrics);
        let mut shutdown_rx = self.shutdown.subscribe();

        self.task_handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    next = events.next_event() => {
                        let Some(logged) = next else {
                            tracing::warn!("event feed ended, listener stopping");
                            break;
                        };
                        let Some(request) = VerificationRequest::from_event(&logged.event) else {
                            continue;
                        };
                        let depth = queue.push(request).await;
                        metrics.requests_enqueued.inc();
                        metrics.queue_depth.set(depth as i64);
                        tracing::info!(
                            campaign = %request.campaign,
                            milestone = request.milestone_index,
                            sequence = logged.sequence,
                            depth,
                            "verification request queued"
                        );
                    }
                }
            }
            tracing::debug!("listener stopped");
        }));
    }

    fn spawn_drain_loop(&mut self) {
        let queue = self.queue.clone();
        let drainer = Arc::clone(&self.drainer);
        let state = Arc::clone(&self.state);
        let cancel = Arc::clone(&self.cancel);
        let period = self.config.drain_interval();
        let mut shutdown_rx = self.shutdown.subscribe();

        self.task_handles.push(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => {
                        if queue.is_empty().await {
                            continue;
                        }
                        state.send_if_modified(|s| {
                            if *s == ServiceState::Running {
                                *s = ServiceState::Draining;
                                true
                            } else {
                                false
                            }
                        });
                        drainer.drain_once(&queue, &cancel).await;
                        state.send_if_modified(|s| {
                            if *s == ServiceState::Draining {
                                *s = ServiceState::Running;
                                true
                            } else {
                                false
                            }
                        });
                    }
                }
            }
            tracing::debug!("drain loop stopped");
        }));
    }

    /// Stop ticking, let the batch in progress settle, then deregister.
    /// A failed deregistration is logged, not returned.
    pub async fn stop(&mut self) -> Result<(), RelayError> {
        tracing::info!("relay shutting down");
        self.state.send_replace(ServiceState::ShuttingDown);
        self.cancel.store(true, Ordering::SeqCst);
        self.shutdown.shutdown();

        let handles = std::mem::take(&mut self.task_handles);
        let wait_all = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "relay task ended abnormally");
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err() {
            tracing::warn!(
                timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                "relay tasks did not stop in time"
            );
        }

        if self.registered {
            let provider = self.config.provider;
            match self.ledger.remove_provider(provider).await {
                Ok(_) => tracing::info!(%provider, "deregistered verification provider"),
                Err(e) => tracing::warn!(%provider, error = %e, "provider deregistration failed"),
            }
            self.registered = false;
        }

        let left = self.queue.len().await;
        if left > 0 {
            tracing::info!(left, "relay stopped with unresolved requests");
        }
        self.state.send_replace(ServiceState::Stopped);
        Ok(())
    }
}
