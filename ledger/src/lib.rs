//! Ledger entity layer.
//!
//! Plain records with their invariants: campaigns, milestones, contributions,
//! the provider set, and the append-only event log. Nothing here enforces
//! access control or decides transitions; the campaign state machine and the
//! verification authority do that on top of these records.

pub mod campaign;
pub mod contribution;
pub mod error;
pub mod event;
pub mod milestone;
pub mod provider;

pub use campaign::{Campaign, CampaignMetadata};
pub use contribution::Contribution;
pub use error::InvariantViolation;
pub use event::{EventLog, LedgerEvent, LoggedEvent};
pub use milestone::{allocate_funding, Milestone, MilestoneSpec, MilestoneState};
pub use provider::ProviderSet;
