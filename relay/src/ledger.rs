//! The relay's view of the ledger: a client for the calls it makes and a
//! feed of the events it reacts to.

use std::time::Duration;

use fundrelay_chain::Receipt;
use fundrelay_ledger::LoggedEvent;
use fundrelay_rpc::error::ErrorBody;
use fundrelay_rpc::handlers::{
    HealthResponse, ProviderChangeResponse, ProviderRequest, SubmissionRequest,
    SubmissionResponse,
};
use fundrelay_types::Address;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::SubmissionError;
use crate::queue::VerificationRequest;

/// Calls the relay makes on the ledger, always as its own provider account.
#[async_trait::async_trait]
pub trait LedgerClient: Send + Sync {
    /// Record a result. An empty receipt means the milestone was already
    /// verified and nothing changed.
    async fn submit_verification(
        &self,
        request: &VerificationRequest,
        verified: bool,
    ) -> Result<Receipt, SubmissionError>;

    async fn add_provider(&self, provider: Address) -> Result<Receipt, SubmissionError>;

    async fn remove_provider(&self, provider: Address) -> Result<Receipt, SubmissionError>;
}

/// Source of logged ledger events, in sequence order.
#[async_trait::async_trait]
pub trait EventSource: Send {
    /// The next event, or `None` once the feed has ended for good.
    async fn next_event(&mut self) -> Option<LoggedEvent>;
}

// ── HTTP ─────────────────────────────────────────────────────────────────

/// [`LedgerClient`] over the node's JSON API.
pub struct HttpLedgerClient {
    client: reqwest::Client,
    base_url: String,
    account: Address,
}

impl HttpLedgerClient {
    pub fn new(base_url: &str, account: Address, timeout: Duration) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmissionError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            account,
        })
    }

    /// Sequence the next logged event will get.
    pub async fn next_sequence(&self) -> Result<u64, SubmissionError> {
        let response = self
            .client
            .get(format!("{}/healthcheck", self.base_url))
            .send()
            .await
            .map_err(|e| SubmissionError::Unavailable(e.to_string()))?;
        let health: HealthResponse = decode(response).await?;
        Ok(health.events)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, SubmissionError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| SubmissionError::Unavailable(e.to_string()))?;
        decode(response).await
    }
}

async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, SubmissionError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<R>()
            .await
            .map_err(|e| SubmissionError::Unavailable(format!("undecodable response: {e}")));
    }
    match response.json::<ErrorBody>().await {
        Ok(body) => Err(SubmissionError::Rejected {
            kind: body.kind,
            message: body.error,
        }),
        Err(_) => Err(SubmissionError::Unavailable(format!("ledger returned {status}"))),
    }
}

#[async_trait::async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn submit_verification(
        &self,
        request: &VerificationRequest,
        verified: bool,
    ) -> Result<Receipt, SubmissionError> {
        let body = SubmissionRequest {
            from: self.account,
            campaign: request.campaign,
            milestone_index: request.milestone_index,
            verified,
        };
        let response: SubmissionResponse = self.post("/authority/submissions", &body).await?;
        Ok(response.receipt)
    }

    async fn add_provider(&self, provider: Address) -> Result<Receipt, SubmissionError> {
        let body = ProviderRequest {
            from: self.account,
            provider,
        };
        let response: ProviderChangeResponse = self.post("/authority/providers", &body).await?;
        Ok(response.receipt)
    }

    async fn remove_provider(&self, provider: Address) -> Result<Receipt, SubmissionError> {
        let body = ProviderRequest {
            from: self.account,
            provider,
        };
        let response: ProviderChangeResponse =
            self.post("/authority/providers/remove", &body).await?;
        Ok(response.receipt)
    }
}

// ── WebSocket ────────────────────────────────────────────────────────────

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`EventSource`] over the node's `/events/ws` feed. Reconnects after any
/// failure and resumes from the sequence after the last event it returned.
pub struct WsEventSource {
    url: String,
    next: u64,
    reconnect_delay: Duration,
    stream: Option<WsStream>,
}

impl WsEventSource {
    pub fn new(url: impl Into<String>, from: u64, reconnect_delay: Duration) -> Self {
        Self {
            url: url.into(),
            next: from,
            reconnect_delay,
            stream: None,
        }
    }

    /// Sequence of the next event this source will return.
    pub fn position(&self) -> u64 {
        self.next
    }

    async fn disconnect(&mut self) {
        self.stream = None;
        tokio::time::sleep(self.reconnect_delay).await;
    }
}

#[async_trait::async_trait]
impl EventSource for WsEventSource {
    async fn next_event(&mut self) -> Option<LoggedEvent> {
        loop {
            if self.stream.is_none() {
                let url = format!("{}?from={}", self.url, self.next);
                match connect_async(url.as_str()).await {
                    Ok((stream, _)) => {
                        tracing::info!(url = %self.url, from = self.next, "event feed connected");
                        self.stream = Some(stream);
                    }
                    Err(e) => {
                        tracing::warn!(url = %self.url, error = %e, "event feed connect failed");
                        tokio::time::sleep(self.reconnect_delay).await;
                        continue;
                    }
                }
            }
            let Some(stream) = self.stream.as_mut() else {
                continue;
            };

            match stream.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<LoggedEvent>(&text) {
                    Ok(event) if event.sequence < self.next => {}
                    Ok(event) => {
                        self.next = event.sequence + 1;
                        return Some(event);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "undecodable event on feed, skipping");
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    tracing::warn!(next = self.next, "event feed closed, reconnecting");
                    self.disconnect().await;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, next = self.next, "event feed error, reconnecting");
                    self.disconnect().await;
                }
            }
        }
    }
}
