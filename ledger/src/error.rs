use thiserror::Error;

/// A ledger record failed an invariant check.
///
/// These never surface to callers of the state machine; a violation means a
/// transition was implemented incorrectly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("funded total {funded} does not match contributions sum {contributed}")]
    FundedMismatch { funded: String, contributed: String },

    #[error("funded total {funded} exceeds goal total {goal_total}")]
    OverFunded { funded: String, goal_total: String },

    #[error("cached goal total {cached} does not match milestone goals sum {computed}")]
    GoalTotalMismatch { cached: String, computed: String },

    #[error("milestone {index}: achieved {achieved} exceeds goal {goal}")]
    AchievedAboveGoal {
        index: usize,
        achieved: String,
        goal: String,
    },

    #[error("milestone {index}: achieved {cached} does not match allocation {allocated}")]
    AllocationMismatch {
        index: usize,
        cached: String,
        allocated: String,
    },

    #[error("milestone {0} is withdrawn but not verified")]
    WithdrawnUnverified(usize),

    #[error("milestone {0} has a non-positive goal")]
    NonPositiveGoal(usize),

    #[error("withdrawn total {withdrawn} does not match withdrawn milestone goals {expected}")]
    WithdrawnMismatch { withdrawn: String, expected: String },

    #[error("contribution {0} has a zero amount")]
    ZeroContribution(usize),

    #[error("backer set does not match contributors")]
    BackerSetMismatch,

    #[error("campaign has no milestones")]
    NoMilestones,

    #[error("arithmetic overflow while checking invariants")]
    Overflow,
}
