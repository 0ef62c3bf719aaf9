//! Prometheus metrics for the relay and its optional HTTP endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};

use crate::error::RelayError;
use crate::service::ServiceState;

pub struct RelayMetrics {
    pub registry: Registry,

    pub requests_enqueued: IntCounter,
    /// Requests that ended in a submission the ledger accepted.
    pub requests_resolved: IntCounter,
    pub decisions_verified: IntCounter,
    pub decisions_rejected: IntCounter,
    /// Failed attempts that were followed by another attempt.
    pub retries: IntCounter,
    pub requests_abandoned: IntCounter,
    pub drain_ticks: IntCounter,
    pub queue_depth: IntGauge,
}

impl RelayMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_enqueued = register_int_counter_with_registry!(
            Opts::new(
                "fundrelay_relay_requests_enqueued_total",
                "Verification requests received from the event feed"
            ),
            registry
        )
        .expect("failed to register requests_enqueued counter");

        let requests_resolved = register_int_counter_with_registry!(
            Opts::new(
                "fundrelay_relay_requests_resolved_total",
                "Verification requests whose result the ledger accepted"
            ),
            registry
        )
        .expect("failed to register requests_resolved counter");

        let decisions_verified = register_int_counter_with_registry!(
            Opts::new(
                "fundrelay_relay_decisions_verified_total",
                "Submitted results that verified the milestone"
            ),
            registry
        )
        .expect("failed to register decisions_verified counter");

        let decisions_rejected = register_int_counter_with_registry!(
            Opts::new(
                "fundrelay_relay_decisions_rejected_total",
                "Submitted results that did not verify the milestone"
            ),
            registry
        )
        .expect("failed to register decisions_rejected counter");

        let retries = register_int_counter_with_registry!(
            Opts::new("fundrelay_relay_retries_total", "Retried resolution attempts"),
            registry
        )
        .expect("failed to register retries counter");

        let requests_abandoned = register_int_counter_with_registry!(
            Opts::new(
                "fundrelay_relay_requests_abandoned_total",
                "Verification requests given up on"
            ),
            registry
        )
        .expect("failed to register requests_abandoned counter");

        let drain_ticks = register_int_counter_with_registry!(
            Opts::new("fundrelay_relay_drain_ticks_total", "Drain loop iterations"),
            registry
        )
        .expect("failed to register drain_ticks counter");

        let queue_depth = register_int_gauge_with_registry!(
            Opts::new("fundrelay_relay_queue_depth", "Requests waiting to be drained"),
            registry
        )
        .expect("failed to register queue_depth gauge");

        Self {
            registry,
            requests_enqueued,
            requests_resolved,
            decisions_verified,
            decisions_rejected,
            retries,
            requests_abandoned,
            drain_ticks,
            queue_depth,
        }
    }

    pub fn encode(&self) -> Result<String, RelayError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| RelayError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| RelayError::Metrics(e.to_string()))
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
struct MetricsState {
    metrics: Arc<RelayMetrics>,
    service: watch::Receiver<ServiceState>,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    state: ServiceState,
}

async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn health_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    let current = *state.service.borrow();
    let status = if current.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(HealthBody { state: current }))
}

pub fn metrics_router(metrics: Arc<RelayMetrics>, service: watch::Receiver<ServiceState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(MetricsState { metrics, service })
}

/// Serve `/metrics` and `/health` until shutdown.
pub async fn serve_metrics(
    addr: SocketAddr,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), RelayError> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "relay metrics listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
        .map_err(|e| RelayError::Metrics(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_text_exposition() {
        let metrics = RelayMetrics::new();
        metrics.requests_enqueued.inc();
        metrics.queue_depth.set(4);
        let text = metrics.encode().unwrap();
        assert!(text.contains("fundrelay_relay_requests_enqueued_total 1"));
        assert!(text.contains("fundrelay_relay_queue_depth 4"));
    }
}
