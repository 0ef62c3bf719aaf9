//! In-process ledger adapters over a [`SharedChain`], for running the relay
//! next to the node in one process.

use std::collections::VecDeque;

use fundrelay_chain::{ChainError, Receipt, SharedChain};
use fundrelay_ledger::LoggedEvent;
use fundrelay_types::Address;
use tokio::sync::broadcast;

use crate::error::SubmissionError;
use crate::ledger::{EventSource, LedgerClient};
use crate::queue::VerificationRequest;

fn rejected(e: ChainError) -> SubmissionError {
    SubmissionError::Rejected {
        kind: e.kind(),
        message: e.to_string(),
    }
}

pub struct LocalLedgerClient {
    chain: SharedChain,
    account: Address,
}

impl LocalLedgerClient {
    pub fn new(chain: SharedChain, account: Address) -> Self {
        Self { chain, account }
    }
}

#[async_trait::async_trait]
impl LedgerClient for LocalLedgerClient {
    async fn submit_verification(
        &self,
        request: &VerificationRequest,
        verified: bool,
    ) -> Result<Receipt, SubmissionError> {
        let account = self.account;
        let request = *request;
        self.chain
            .transact(|c| {
                c.submit_verification(
                    account,
                    &request.campaign,
                    request.milestone_index,
                    verified,
                )
            })
            .await
            .map(|(_, receipt)| receipt)
            .map_err(rejected)
    }

    async fn add_provider(&self, provider: Address) -> Result<Receipt, SubmissionError> {
        let account = self.account;
        self.chain
            .transact(|c| c.add_provider(account, provider))
            .await
            .map(|(_, receipt)| receipt)
            .map_err(rejected)
    }

    async fn remove_provider(&self, provider: Address) -> Result<Receipt, SubmissionError> {
        let account = self.account;
        self.chain
            .transact(|c| c.remove_provider(account, provider))
            .await
            .map(|(_, receipt)| receipt)
            .map_err(rejected)
    }
}

/// Event feed straight from the chain's broadcast channel. Falls back to the
/// event log when the receiver lags, so no event is skipped.
pub struct LocalEventSource {
    chain: SharedChain,
    rx: broadcast::Receiver<LoggedEvent>,
    backlog: VecDeque<LoggedEvent>,
    next: u64,
}

impl LocalEventSource {
    /// Every event from sequence `from` onwards.
    pub async fn from_sequence(chain: SharedChain, from: u64) -> Self {
        let (backlog, rx) = chain.subscribe_from(from).await;
        Self {
            chain,
            rx,
            backlog: backlog.into(),
            next: from,
        }
    }

    /// Only events logged after this call.
    pub async fn live(chain: SharedChain) -> Self {
        let head = chain.read(|c| c.events().next_sequence()).await;
        Self::from_sequence(chain, head).await
    }
}

#[async_trait::async_trait]
impl EventSource for LocalEventSource {
    async fn next_event(&mut self) -> Option<LoggedEvent> {
        loop {
            if let Some(event) = self.backlog.pop_front() {
                if event.sequence < self.next {
                    continue;
                }
                self.next = event.sequence + 1;
                return Some(event);
            }
            match self.rx.recv().await {
                Ok(event) => self.backlog.push_back(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, next = self.next, "relay feed lagged, replaying from log");
                    let next = self.next;
                    let missed = self
                        .chain
                        .read(|c| c.events().range(next, usize::MAX).to_vec())
                        .await;
                    self.backlog.extend(missed);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
