//! Nullable ledger client: records calls instead of reaching a ledger.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use fundrelay_chain::Receipt;
use fundrelay_ledger::{LedgerEvent, LoggedEvent};
use fundrelay_relay::{LedgerClient, SubmissionError, VerificationRequest};
use fundrelay_types::{Address, Timestamp};

/// A ledger client that accepts everything unless told to fail.
#[derive(Default)]
pub struct NullLedgerClient {
    submissions: Mutex<Vec<(VerificationRequest, bool)>>,
    added: Mutex<Vec<Address>>,
    removed: Mutex<Vec<Address>>,
    submit_failure: Mutex<Option<SubmissionError>>,
    register_failure: Mutex<Option<SubmissionError>>,
    deregister_failure: Mutex<Option<SubmissionError>>,
    submit_calls: AtomicUsize,
    next_sequence: AtomicU64,
}

impl NullLedgerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `submit_verification` call with `error`.
    pub fn fail_submissions(&self, error: SubmissionError) {
        *self.submit_failure.lock().unwrap() = Some(error);
    }

    /// Fail `add_provider` with `error`.
    pub fn fail_registration(&self, error: SubmissionError) {
        *self.register_failure.lock().unwrap() = Some(error);
    }

    /// Fail `remove_provider` with `error`.
    pub fn fail_deregistration(&self, error: SubmissionError) {
        *self.deregister_failure.lock().unwrap() = Some(error);
    }

    /// Accepted submissions, in order.
    pub fn submissions(&self) -> Vec<(VerificationRequest, bool)> {
        self.submissions.lock().unwrap().clone()
    }

    /// Every `submit_verification` call, accepted or not.
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn added_providers(&self) -> Vec<Address> {
        self.added.lock().unwrap().clone()
    }

    pub fn removed_providers(&self) -> Vec<Address> {
        self.removed.lock().unwrap().clone()
    }

    fn receipt(&self, event: LedgerEvent) -> Receipt {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        Receipt::single(LoggedEvent {
            sequence,
            timestamp: Timestamp::new(sequence),
            event,
        })
    }
}

#[async_trait::async_trait]
impl LedgerClient for NullLedgerClient {
    async fn submit_verification(
        &self,
        request: &VerificationRequest,
        verified: bool,
    ) -> Result<Receipt, SubmissionError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.submit_failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.submissions.lock().unwrap().push((*request, verified));
        Ok(self.receipt(LedgerEvent::MilestoneVerificationRecorded {
            campaign: request.campaign,
            milestone_index: request.milestone_index,
            verified,
        }))
    }

    async fn add_provider(&self, provider: Address) -> Result<Receipt, SubmissionError> {
        if let Some(error) = self.register_failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.added.lock().unwrap().push(provider);
        Ok(self.receipt(LedgerEvent::ProviderAdded { provider }))
    }

    async fn remove_provider(&self, provider: Address) -> Result<Receipt, SubmissionError> {
        if let Some(error) = self.deregister_failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.removed.lock().unwrap().push(provider);
        Ok(self.receipt(LedgerEvent::ProviderRemoved { provider }))
    }
}
