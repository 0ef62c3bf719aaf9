//! Ledger events and the append-only event log.
//!
//! The log is the durable record of everything the ledger did, including
//! every verification request. Off-chain consumers (the relay, a UI) read it
//! either as a push feed or by sequence range.

use fundrelay_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// Something that happened on the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A campaign was deployed by the registry.
    CampaignCreated {
        campaign: Address,
        manager: Address,
        name: String,
        description: String,
    },
    /// A contribution was accepted.
    ContributionMade {
        campaign: Address,
        backer: Address,
        amount: Amount,
        timestamp: Timestamp,
        campaign_name: String,
    },
    /// The manager asked for a milestone to be verified.
    MilestoneVerificationRequested {
        campaign: Address,
        milestone_index: usize,
    },
    /// The authority recorded a verification result on an unverified milestone.
    MilestoneVerificationRecorded {
        campaign: Address,
        milestone_index: usize,
        verified: bool,
    },
    /// Escrowed funds for a milestone were released to the manager.
    FundsWithdrawn {
        campaign: Address,
        milestone_index: usize,
        manager: Address,
        amount: Amount,
    },
    ProviderAdded {
        provider: Address,
    },
    ProviderRemoved {
        provider: Address,
    },
}

impl LedgerEvent {
    /// Stable snake_case name of the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CampaignCreated { .. } => "campaign_created",
            Self::ContributionMade { .. } => "contribution_made",
            Self::MilestoneVerificationRequested { .. } => "milestone_verification_requested",
            Self::MilestoneVerificationRecorded { .. } => "milestone_verification_recorded",
            Self::FundsWithdrawn { .. } => "funds_withdrawn",
            Self::ProviderAdded { .. } => "provider_added",
            Self::ProviderRemoved { .. } => "provider_removed",
        }
    }

    /// The campaign this event concerns, if any.
    pub fn campaign(&self) -> Option<&Address> {
        match self {
            Self::CampaignCreated { campaign, .. }
            | Self::ContributionMade { campaign, .. }
            | Self::MilestoneVerificationRequested { campaign, .. }
            | Self::MilestoneVerificationRecorded { campaign, .. }
            | Self::FundsWithdrawn { campaign, .. } => Some(campaign),
            Self::ProviderAdded { .. } | Self::ProviderRemoved { .. } => None,
        }
    }

    /// The `(campaign, milestone)` pair if this is a verification request.
    pub fn verification_request(&self) -> Option<(Address, usize)> {
        match self {
            Self::MilestoneVerificationRequested {
                campaign,
                milestone_index,
            } => Some((*campaign, *milestone_index)),
            _ => None,
        }
    }
}

/// An event together with its position in the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Zero-based, gap-free position in the log.
    pub sequence: u64,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Append-only event log. Sequence numbers equal vector positions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LoggedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return the logged copy.
    pub fn append(&mut self, event: LedgerEvent, timestamp: Timestamp) -> LoggedEvent {
        let logged = LoggedEvent {
            sequence: self.entries.len() as u64,
            timestamp,
            event,
        };
        self.entries.push(logged.clone());
        logged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence number the next appended event will receive.
    pub fn next_sequence(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn get(&self, sequence: u64) -> Option<&LoggedEvent> {
        usize::try_from(sequence)
            .ok()
            .and_then(|i| self.entries.get(i))
    }

    /// Up to `limit` events starting at sequence `from`.
    pub fn range(&self, from: u64, limit: usize) -> &[LoggedEvent] {
        let start = usize::try_from(from)
            .unwrap_or(usize::MAX)
            .min(self.entries.len());
        let end = start.saturating_add(limit).min(self.entries.len());
        &self.entries[start..end]
    }

    /// Events whose timestamp lies in `[since, until]`.
    pub fn between(
        &self,
        since: Timestamp,
        until: Timestamp,
    ) -> impl Iterator<Item = &LoggedEvent> {
        self.entries
            .iter()
            .filter(move |e| e.timestamp >= since && e.timestamp <= until)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.entries.iter()
    }
}
