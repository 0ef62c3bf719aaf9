//! Milestone records and the funding allocation rule.

use fundrelay_types::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// Caller-supplied description of a milestone at campaign creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub goal: Amount,
}

impl MilestoneSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, goal: Amount) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            goal,
        }
    }
}

/// A funding checkpoint inside a campaign.
///
/// `verified` and `withdrawn` only ever move from `false` to `true`, and
/// `achieved` only ever grows, capped at `goal`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub name: String,
    pub description: String,
    pub goal: Amount,
    pub achieved: Amount,
    pub verified: bool,
    pub withdrawn: bool,
    pub last_verification_request: Option<Timestamp>,
}

impl Milestone {
    pub fn from_spec(spec: MilestoneSpec) -> Self {
        Self {
            name: spec.name,
            description: spec.description,
            goal: spec.goal,
            achieved: Amount::ZERO,
            verified: false,
            withdrawn: false,
            last_verification_request: None,
        }
    }

    /// Where this milestone sits in its lifecycle.
    pub fn state(&self) -> MilestoneState {
        if self.withdrawn {
            MilestoneState::Withdrawn
        } else if self.verified {
            MilestoneState::Verified
        } else if self.last_verification_request.is_some() {
            MilestoneState::VerificationRequested
        } else {
            MilestoneState::Pending
        }
    }

    /// Whether the allocated funding has reached the goal.
    pub fn is_fully_funded(&self) -> bool {
        self.achieved >= self.goal
    }
}

/// Lifecycle of a milestone.
///
/// A negative verification result leaves the milestone in
/// `VerificationRequested`; the manager may request again after the cooldown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneState {
    Pending,
    VerificationRequested,
    Verified,
    Withdrawn,
}

impl MilestoneState {
    /// Whether a verification request may be issued in this state (cooldown aside).
    pub fn accepts_verification_request(&self) -> bool {
        matches!(self, Self::Pending | Self::VerificationRequested)
    }
}

/// Allocate a funded total across milestone goals in order.
///
/// Milestone `i` receives `clamp(funded - sum(goals[..i]), 0, goals[i])`.
/// Because the funded total only grows, every milestone's allocation only
/// grows too, and earlier milestones fill before later ones.
pub fn allocate_funding(goals: &[Amount], funded: Amount) -> Vec<Amount> {
    let mut remaining = funded;
    goals
        .iter()
        .map(|&goal| {
            let share = remaining.min(goal);
            remaining = remaining.saturating_sub(share);
            share
        })
        .collect()
}
