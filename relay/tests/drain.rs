//! Batch draining and retry behaviour against null doubles.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use fundrelay_nullables::{NullDataSource, NullLedgerClient};
use fundrelay_relay::{
    DataSourceError, DecisionPolicy, Drainer, RelayConfig, RelayMetrics, RequestQueue,
    Resolution, SubmissionError, VerificationRequest,
};
use fundrelay_types::{Address, ErrorKind};

fn request(i: usize) -> VerificationRequest {
    VerificationRequest::new(Address::from_label("campaign"), i)
}

fn drainer(
    config: &RelayConfig,
    source: &Arc<NullDataSource>,
    ledger: &Arc<NullLedgerClient>,
) -> Drainer {
    Drainer::new(
        config,
        source.clone(),
        ledger.clone(),
        Arc::new(RelayMetrics::new()),
    )
}

#[tokio::test]
async fn each_tick_takes_at_most_one_batch() {
    let config = RelayConfig::default();
    let source = Arc::new(NullDataSource::returning(2));
    let ledger = Arc::new(NullLedgerClient::new());
    let drainer = drainer(&config, &source, &ledger);
    let queue = RequestQueue::new();
    for i in 0..5 {
        queue.push(request(i)).await;
    }
    let cancel = AtomicBool::new(false);

    let first = drainer.drain_once(&queue, &cancel).await;
    assert_eq!(first.taken, 3);
    assert_eq!(first.submitted, 3);
    assert_eq!(queue.len().await, 2);

    let second = drainer.drain_once(&queue, &cancel).await;
    assert_eq!(second.taken, 2);
    assert!(queue.is_empty().await);

    let order: Vec<usize> = ledger
        .submissions()
        .iter()
        .map(|(r, _)| r.milestone_index)
        .collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
    assert!(ledger.submissions().iter().all(|(_, verified)| *verified));
}

#[tokio::test]
async fn odd_signal_submits_not_verified() {
    let config = RelayConfig::default();
    let source = Arc::new(NullDataSource::returning(7));
    let ledger = Arc::new(NullLedgerClient::new());
    let resolution = drainer(&config, &source, &ledger).resolve(&request(0)).await;
    assert_eq!(
        resolution,
        Resolution::Submitted {
            verified: false,
            recorded: true,
            attempts: 1
        }
    );
}

#[tokio::test]
async fn failing_request_is_abandoned_after_max_attempts_and_does_not_block() {
    let config = RelayConfig::default();
    let source = Arc::new(NullDataSource::returning(4));
    for _ in 0..config.max_attempts {
        source.push(Err(DataSourceError::Transport("timeout".into())));
    }
    let ledger = Arc::new(NullLedgerClient::new());
    let drainer = drainer(&config, &source, &ledger);
    let queue = RequestQueue::new();
    queue.push(request(0)).await;
    queue.push(request(1)).await;

    let report = drainer.drain_once(&queue, &AtomicBool::new(false)).await;
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.submitted, 1);
    // Five failed fetches for the first request, one for the second.
    assert_eq!(source.calls(), config.max_attempts as usize + 1);
    assert_eq!(ledger.submissions(), vec![(request(1), true)]);
    assert!(queue.is_empty().await, "abandoned requests are not re-queued");
}

#[tokio::test]
async fn submission_failures_count_toward_the_attempt_bound() {
    let config = RelayConfig {
        max_attempts: 3,
        ..RelayConfig::default()
    };
    let source = Arc::new(NullDataSource::returning(2));
    let ledger = Arc::new(NullLedgerClient::new());
    ledger.fail_submissions(SubmissionError::Unavailable("connection refused".into()));

    let resolution = drainer(&config, &source, &ledger).resolve(&request(0)).await;
    assert_eq!(resolution, Resolution::Exhausted { attempts: 3 });
    assert_eq!(ledger.submit_calls(), 3);
    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn ledger_rejection_abandons_immediately() {
    let config = RelayConfig::default();
    let source = Arc::new(NullDataSource::returning(2));
    let ledger = Arc::new(NullLedgerClient::new());
    ledger.fail_submissions(SubmissionError::Rejected {
        kind: ErrorKind::Authorization,
        message: "not a registered provider".into(),
    });

    let resolution = drainer(&config, &source, &ledger).resolve(&request(0)).await;
    assert!(matches!(resolution, Resolution::Rejected { attempts: 1, .. }));
    assert_eq!(ledger.submit_calls(), 1);
}

#[tokio::test]
async fn cancellation_is_checked_between_requests() {
    let config = RelayConfig {
        finish_batch_on_shutdown: false,
        ..RelayConfig::default()
    };
    let source = Arc::new(NullDataSource::returning(2));
    let ledger = Arc::new(NullLedgerClient::new());
    let drainer = drainer(&config, &source, &ledger);
    let queue = RequestQueue::new();
    for i in 0..3 {
        queue.push(request(i)).await;
    }

    let report = drainer.drain_once(&queue, &AtomicBool::new(true)).await;
    assert_eq!(report.taken, 3);
    assert_eq!(report.cancelled, 3);
    assert!(ledger.submissions().is_empty());

    let finishing = Drainer::new(
        &RelayConfig::default(),
        source.clone(),
        ledger.clone(),
        Arc::new(RelayMetrics::new()),
    );
    queue.push(request(9)).await;
    let report = finishing.drain_once(&queue, &AtomicBool::new(true)).await;
    assert_eq!(report.submitted, 1);
}

#[tokio::test]
async fn threshold_policy_is_pluggable() {
    let config = RelayConfig {
        policy: DecisionPolicy::Threshold { at_least: 900 },
        ..RelayConfig::default()
    };
    let source = Arc::new(NullDataSource::returning(950));
    let ledger = Arc::new(NullLedgerClient::new());
    drainer(&config, &source, &ledger).resolve(&request(0)).await;
    assert_eq!(ledger.submissions(), vec![(request(0), true)]);
}
