//! Prometheus metrics for the ledger node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] that the RPC `/metrics`
//! endpoint encodes. Counters follow the event log; gauges are refreshed from
//! the ledger state.

use fundrelay_chain::Chain;
use fundrelay_ledger::{LedgerEvent, LoggedEvent};
use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Logged events, labelled by event type.
    pub events: IntCounterVec,
    /// Verification results recorded as verified.
    pub milestones_verified: IntCounter,
    /// Verification results recorded as not verified.
    pub milestones_rejected: IntCounter,
    /// Snapshots written to disk.
    pub snapshots_written: IntCounter,
    /// Snapshot writes that failed.
    pub snapshot_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub campaign_count: IntGauge,
    pub provider_count: IntGauge,
    /// Sequence number the next logged event will receive.
    pub next_sequence: IntGauge,
}

impl NodeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let events = register_int_counter_vec_with_registry!(
            Opts::new("fundrelay_events_total", "Ledger events logged, by type"),
            &["type"],
            registry
        )
        .expect("failed to register events counter");

        let milestones_verified = register_int_counter_with_registry!(
            Opts::new(
                "fundrelay_milestones_verified_total",
                "Milestone verification results recorded as verified"
            ),
            registry
        )
        .expect("failed to register milestones_verified counter");

        let milestones_rejected = register_int_counter_with_registry!(
            Opts::new(
                "fundrelay_milestones_rejected_total",
                "Milestone verification results recorded as not verified"
            ),
            registry
        )
        .expect("failed to register milestones_rejected counter");

        let snapshots_written = register_int_counter_with_registry!(
            Opts::new("fundrelay_snapshots_written_total", "Ledger snapshots written"),
            registry
        )
        .expect("failed to register snapshots_written counter");

        let snapshot_failures = register_int_counter_with_registry!(
            Opts::new("fundrelay_snapshot_failures_total", "Failed ledger snapshot writes"),
            registry
        )
        .expect("failed to register snapshot_failures counter");

        let campaign_count = register_int_gauge_with_registry!(
            Opts::new("fundrelay_campaign_count", "Campaigns deployed by the registry"),
            registry
        )
        .expect("failed to register campaign_count gauge");

        let provider_count = register_int_gauge_with_registry!(
            Opts::new("fundrelay_provider_count", "Registered verification providers"),
            registry
        )
        .expect("failed to register provider_count gauge");

        let next_sequence = register_int_gauge_with_registry!(
            Opts::new("fundrelay_event_sequence", "Sequence of the next logged event"),
            registry
        )
        .expect("failed to register next_sequence gauge");

        Self {
            registry,
            events,
            milestones_verified,
            milestones_rejected,
            snapshots_written,
            snapshot_failures,
            campaign_count,
            provider_count,
            next_sequence,
        }
    }

    /// Count one logged event.
    pub fn observe(&self, logged: &LoggedEvent) {
        self.events.with_label_values(&[logged.event.kind()]).inc();
        if let LedgerEvent::MilestoneVerificationRecorded { verified, .. } = logged.event {
            if verified {
                self.milestones_verified.inc();
            } else {
                self.milestones_rejected.inc();
            }
        }
        self.next_sequence.set(logged.sequence as i64 + 1);
    }

    /// Refresh gauges from the current ledger state.
    pub fn sync_gauges(&self, chain: &Chain) {
        self.campaign_count.set(chain.registry().len() as i64);
        self.provider_count
            .set(chain.authority().provider_count() as i64);
        self.next_sequence
            .set(chain.events().next_sequence() as i64);
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
