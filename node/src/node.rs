//! The ledger node: owns the shared chain and runs the RPC server, the
//! metrics follower and the snapshot writer as background tasks.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fundrelay_chain::{Chain, SharedChain};
use fundrelay_rpc::{RpcServer, RpcState};
use fundrelay_types::Clock;
use fundrelay_utils::ShutdownController;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::NodeConfig;
use crate::metrics::NodeMetrics;
use crate::snapshot::{load_snapshot, save_snapshot};
use crate::NodeError;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct LedgerNode {
    config: NodeConfig,
    chain: SharedChain,
    metrics: Arc<NodeMetrics>,
    shutdown: ShutdownController,
    local_addr: Option<SocketAddr>,
    task_handles: Vec<JoinHandle<()>>,
}

impl LedgerNode {
    /// Restore the ledger from the configured snapshot, or create a fresh one
    /// with the configured genesis allocations.
    pub fn new(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Self, NodeError> {
        let restored = match &config.snapshot_path {
            Some(path) => load_snapshot(path)?,
            None => None,
        };

        let chain = match restored {
            Some(state) => {
                tracing::info!(
                    campaigns = state.registry.len(),
                    events = state.events.len(),
                    "ledger restored from snapshot"
                );
                Chain::from_state(state, clock)
            }
            None => {
                let mut chain = Chain::new(config.owner, config.params.clone(), clock);
                for allocation in &config.allocations {
                    chain.deposit(allocation.account, allocation.amount)?;
                }
                tracing::info!(
                    owner = %config.owner,
                    authority = %chain.authority().address(),
                    registry = %chain.registry().address(),
                    allocations = config.allocations.len(),
                    "fresh ledger created"
                );
                chain
            }
        };

        let metrics = Arc::new(NodeMetrics::new());
        metrics.sync_gauges(&chain);

        Ok(Self {
            config,
            chain: SharedChain::new(chain),
            metrics,
            shutdown: ShutdownController::new(),
            local_addr: None,
            task_handles: Vec::new(),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Handle to the ledger for in-process consumers.
    pub fn chain(&self) -> &SharedChain {
        &self.chain
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// Address the RPC server is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the RPC listener and spawn the background tasks.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        if self.local_addr.is_some() {
            return Err(NodeError::AlreadyStarted);
        }

        let listener = TcpListener::bind(self.config.rpc_addr()?).await?;
        let addr = listener.local_addr()?;

        let server = RpcServer::new(
            RpcState {
                chain: self.chain.clone(),
                metrics: self.metrics.registry.clone(),
                enable_faucet: self.config.enable_faucet,
            },
            &self.config.cors_origins,
        )
        .map_err(|e| NodeError::Rpc(e.to_string()))?;

        let shutdown_rx_rpc = self.shutdown.subscribe();
        self.task_handles.push(tokio::spawn(async move {
            if let Err(e) = server.serve(listener, shutdown_rx_rpc).await {
                tracing::error!(error = %e, "RPC server failed");
            }
        }));

        self.spawn_metrics_follower();

        if let Some(path) = self.config.snapshot_path.clone() {
            self.spawn_snapshot_writer(path);
        }

        self.local_addr = Some(addr);
        tracing::info!(
            %addr,
            faucet = self.config.enable_faucet,
            snapshots = self.config.snapshot_path.is_some(),
            "ledger node started"
        );
        Ok(())
    }

    fn spawn_metrics_follower(&mut self) {
        let mut events = self.chain.subscribe();
        let chain = self.chain.clone();
        let metrics = Arc::clone(&self.metrics);
        let mut shutdown_rx = self.shutdown.subscribe();

        self.task_handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    received = events.recv() => match received {
                        Ok(event) => {
                            metrics.observe(&event);
                            chain.read(|c| metrics.sync_gauges(c)).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "metrics follower lagged behind the event feed");
                            chain.read(|c| metrics.sync_gauges(c)).await;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        }));
    }

    fn spawn_snapshot_writer(&mut self, path: PathBuf) {
        let chain = self.chain.clone();
        let metrics = Arc::clone(&self.metrics);
        let mut shutdown_rx = self.shutdown.subscribe();
        let period = Duration::from_secs(self.config.snapshot_interval_secs.max(1));

        self.task_handles.push(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            let mut written_through = None;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("snapshot writer shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let next = chain.read(|c| c.events().next_sequence()).await;
                        if written_through == Some(next) {
                            continue;
                        }
                        match write_snapshot(&chain, path.clone()).await {
                            Ok(()) => {
                                metrics.snapshots_written.inc();
                                written_through = Some(next);
                            }
                            Err(e) => {
                                metrics.snapshot_failures.inc();
                                tracing::warn!(error = %e, path = %path.display(), "periodic snapshot failed");
                            }
                        }
                    }
                }
            }
        }));
    }

    /// Write a snapshot immediately. Returns false when no snapshot path is
    /// configured.
    pub async fn snapshot_now(&self) -> Result<bool, NodeError> {
        let Some(path) = self.config.snapshot_path.clone() else {
            return Ok(false);
        };
        write_snapshot(&self.chain, path).await?;
        self.metrics.snapshots_written.inc();
        Ok(true)
    }

    /// Stop every background task, then write a final snapshot.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("ledger node stopping");
        self.shutdown.shutdown();

        let handles = std::mem::take(&mut self.task_handles);
        let wait_all = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "node task ended abnormally");
                }
            }
        };
        let timed_out = tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err();

        self.snapshot_now().await?;
        self.local_addr = None;

        if timed_out {
            tracing::warn!(
                timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                "node tasks did not stop in time"
            );
            return Err(NodeError::ShutdownTimeout);
        }
        tracing::info!("ledger node stopped");
        Ok(())
    }
}

async fn write_snapshot(chain: &SharedChain, path: PathBuf) -> Result<(), NodeError> {
    let state = chain.read(|c| c.state().clone()).await;
    tokio::task::spawn_blocking(move || save_snapshot(&path, &state))
        .await
        .map_err(|e| NodeError::Io(std::io::Error::other(e)))?
}
