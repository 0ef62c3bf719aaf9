//! Pending verification requests shared between the listener and the drain
//! loop.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use fundrelay_ledger::LedgerEvent;
use fundrelay_types::Address;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// One milestone awaiting a verification result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub campaign: Address,
    pub milestone_index: usize,
}

impl VerificationRequest {
    pub fn new(campaign: Address, milestone_index: usize) -> Self {
        Self {
            campaign,
            milestone_index,
        }
    }

    /// The request carried by a `MilestoneVerificationRequested` event.
    pub fn from_event(event: &LedgerEvent) -> Option<Self> {
        match *event {
            LedgerEvent::MilestoneVerificationRequested {
                campaign,
                milestone_index,
            } => Some(Self::new(campaign, milestone_index)),
            _ => None,
        }
    }
}

impl fmt::Display for VerificationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.campaign, self.milestone_index)
    }
}

/// FIFO of pending requests. Duplicates are kept; the ledger makes
/// resolving the same milestone twice harmless.
#[derive(Clone, Default)]
pub struct RequestQueue {
    inner: Arc<Mutex<VecDeque<VerificationRequest>>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, request: VerificationRequest) -> usize {
        let mut queue = self.inner.lock().await;
        queue.push_back(request);
        queue.len()
    }

    /// Remove up to `max` requests from the front.
    pub async fn take_batch(&self, max: usize) -> Vec<VerificationRequest> {
        let mut queue = self.inner.lock().await;
        let n = max.min(queue.len());
        queue.drain(..n).collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
