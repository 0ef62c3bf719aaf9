//! Resolving queued requests: fetch a signal, decide, submit, retry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fundrelay_chain::Receipt;

use crate::config::{RelayConfig, RetryBackoff};
use crate::error::{AttemptError, SubmissionError};
use crate::ledger::LedgerClient;
use crate::metrics::RelayMetrics;
use crate::policy::DecisionPolicy;
use crate::queue::{RequestQueue, VerificationRequest};
use crate::source::DataSource;

/// How one request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The ledger accepted the result. `recorded` is false when the
    /// milestone had already been verified.
    Submitted {
        verified: bool,
        recorded: bool,
        attempts: u32,
    },
    /// Every attempt failed.
    Exhausted { attempts: u32 },
    /// The ledger refused the call; retrying cannot help.
    Rejected { attempts: u32, error: SubmissionError },
}

impl Resolution {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Submitted { attempts, .. }
            | Self::Exhausted { attempts }
            | Self::Rejected { attempts, .. } => *attempts,
        }
    }
}

/// Outcome of one drain tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Requests taken off the queue.
    pub taken: usize,
    pub submitted: usize,
    pub abandoned: usize,
    /// Requests taken but never attempted because shutdown arrived.
    pub cancelled: usize,
}

impl DrainReport {
    pub fn is_idle(&self) -> bool {
        self.taken == 0
    }
}

pub struct Drainer {
    source: Arc<dyn DataSource>,
    ledger: Arc<dyn LedgerClient>,
    policy: DecisionPolicy,
    batch_size: usize,
    max_attempts: u32,
    backoff: RetryBackoff,
    finish_batch_on_shutdown: bool,
    metrics: Arc<RelayMetrics>,
}

impl Drainer {
    pub fn new(
        config: &RelayConfig,
        source: Arc<dyn DataSource>,
        ledger: Arc<dyn LedgerClient>,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            source,
            ledger,
            policy: config.policy,
            batch_size: config.batch_size.max(1),
            max_attempts: config.max_attempts.max(1),
            backoff: config.retry_backoff,
            finish_batch_on_shutdown: config.finish_batch_on_shutdown,
            metrics,
        }
    }

    /// Take up to one batch off the queue and resolve it in order.
    ///
    /// `cancel` is checked between requests only; a request in progress always
    /// runs to completion.
    pub async fn drain_once(&self, queue: &RequestQueue, cancel: &AtomicBool) -> DrainReport {
        self.metrics.drain_ticks.inc();
        let batch = queue.take_batch(self.batch_size).await;
        let mut report = DrainReport {
            taken: batch.len(),
            ..DrainReport::default()
        };

        for (i, request) in batch.iter().enumerate() {
            if !self.finish_batch_on_shutdown && cancel.load(Ordering::SeqCst) {
                report.cancelled = batch.len() - i;
                tracing::info!(
                    dropped = report.cancelled,
                    "shutdown requested, leaving rest of batch unresolved"
                );
                break;
            }
            match self.resolve(request).await {
                Resolution::Submitted { .. } => report.submitted += 1,
                _ => report.abandoned += 1,
            }
        }

        self.metrics.queue_depth.set(queue.len().await as i64);
        if !report.is_idle() {
            tracing::debug!(
                taken = report.taken,
                submitted = report.submitted,
                abandoned = report.abandoned,
                cancelled = report.cancelled,
                "drain tick finished"
            );
        }
        report
    }

    /// Resolve one request with bounded retries.
    pub async fn resolve(&self, request: &VerificationRequest) -> Resolution {
        let mut attempt = 0;
        while attempt < self.max_attempts {
            attempt += 1;
            match self.attempt(request).await {
                Ok((verified, receipt)) => {
                    self.metrics.requests_resolved.inc();
                    if verified {
                        self.metrics.decisions_verified.inc();
                    } else {
                        self.metrics.decisions_rejected.inc();
                    }
                    tracing::info!(
                        campaign = %request.campaign,
                        milestone = request.milestone_index,
                        verified,
                        recorded = !receipt.is_empty(),
                        attempt,
                        "verification submitted"
                    );
                    return Resolution::Submitted {
                        verified,
                        recorded: !receipt.is_empty(),
                        attempts: attempt,
                    };
                }
                Err(AttemptError::Ledger(error)) if !error.is_retryable() => {
                    self.metrics.requests_abandoned.inc();
                    tracing::warn!(
                        campaign = %request.campaign,
                        milestone = request.milestone_index,
                        attempt,
                        error = %error,
                        "ledger rejected verification, abandoning request"
                    );
                    return Resolution::Rejected {
                        attempts: attempt,
                        error,
                    };
                }
                Err(error) => {
                    tracing::warn!(
                        campaign = %request.campaign,
                        milestone = request.milestone_index,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %error,
                        "verification attempt failed"
                    );
                    if attempt < self.max_attempts {
                        self.metrics.retries.inc();
                        let delay = self.backoff.delay(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        self.metrics.requests_abandoned.inc();
        tracing::warn!(
            campaign = %request.campaign,
            milestone = request.milestone_index,
            attempts = attempt,
            "verification attempts exhausted, abandoning request"
        );
        Resolution::Exhausted { attempts: attempt }
    }

    async fn attempt(&self, request: &VerificationRequest) -> Result<(bool, Receipt), AttemptError> {
        let signal = self.source.fetch_signal().await?;
        let verified = self.policy.decide(signal);
        let receipt = self.ledger.submit_verification(request, verified).await?;
        Ok((verified, receipt))
    }
}
