//! Axum-based API server.

use crate::error::RpcError;
use crate::{handlers, ws};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use fundrelay_chain::SharedChain;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// State shared by every handler.
#[derive(Clone)]
pub struct RpcState {
    pub chain: SharedChain,
    /// Registry encoded by `GET /metrics`.
    pub metrics: prometheus::Registry,
    pub enable_faucet: bool,
}

/// Build the API router.
pub fn router(state: RpcState) -> Router {
    Router::new()
        .route("/healthcheck", get(handlers::healthcheck))
        .route(
            "/campaigns",
            get(handlers::list_campaigns).post(handlers::create_campaign),
        )
        .route("/campaigns/summaries", get(handlers::campaign_summaries))
        .route("/campaigns/:campaign", get(handlers::campaign_detail))
        .route("/campaigns/:campaign/summary", get(handlers::campaign_summary))
        .route("/campaigns/:campaign/milestones", get(handlers::campaign_milestones))
        .route(
            "/campaigns/:campaign/contributions",
            get(handlers::campaign_contributions),
        )
        .route("/campaigns/:campaign/contribute", post(handlers::contribute))
        .route(
            "/campaigns/:campaign/milestones/:index/request-verification",
            post(handlers::request_verification),
        )
        .route(
            "/campaigns/:campaign/milestones/:index/withdraw",
            post(handlers::withdraw),
        )
        .route("/backers/:backer/contributions", get(handlers::backer_contributions))
        .route("/accounts/:account/balance", get(handlers::balance))
        .route("/accounts/:account/faucet", post(handlers::faucet))
        .route(
            "/authority/providers",
            get(handlers::providers).post(handlers::add_provider),
        )
        .route("/authority/providers/remove", post(handlers::remove_provider))
        .route("/authority/admin", post(handlers::set_admin))
        .route("/authority/submissions", post(handlers::submit_verification))
        .route("/events", get(handlers::events))
        .route("/events/ws", get(ws::events_ws))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

/// CORS policy: any origin when `origins` is empty, otherwise exactly those.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, RpcError> {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o)
                    .map_err(|_| RpcError::InvalidRequest(format!("bad CORS origin {o:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(values)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

pub struct RpcServer {
    state: RpcState,
    cors: CorsLayer,
}

impl RpcServer {
    pub fn new(state: RpcState, cors_origins: &[String]) -> Result<Self, RpcError> {
        Ok(Self {
            state,
            cors: cors_layer(cors_origins)?,
        })
    }

    pub fn router(&self) -> Router {
        router(self.state.clone()).layer(self.cors.clone())
    }

    /// Serve until a shutdown signal arrives.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), RpcError> {
        let app = self.router();
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "RPC server listening");
        }
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
