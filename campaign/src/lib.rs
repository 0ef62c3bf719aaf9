//! Campaign state machine.
//!
//! [`CampaignEngine`] applies the four campaign transitions to a
//! [`Campaign`](fundrelay_ledger::Campaign) record. Every transition validates
//! completely before mutating, so a rejected call leaves the record untouched.

pub mod context;
pub mod contract;
pub mod engine;
pub mod error;
pub mod view;

pub use context::CallContext;
pub use contract::CampaignContract;
pub use engine::{CampaignEngine, Withdrawal};
pub use error::{CampaignError, Ineligibility};
pub use view::{BackerContribution, CampaignDetail, CampaignSummary, MilestoneView};
